//! GraphQL documents sent to the central data and series state services

/// Newest-first listing of series for one title
pub const ALL_SERIES: &str = r"
query AllSeries($first: Int!, $after: Cursor, $titleId: ID!) {
  allSeries(
    first: $first
    after: $after
    filter: { titleId: $titleId }
    orderBy: StartTimeScheduled
    orderDirection: DESC
  ) {
    totalCount
    pageInfo {
      hasNextPage
      endCursor
    }
    edges {
      cursor
      node {
        id
        title { name }
        tournament { id name }
        type
        startTimeScheduled
      }
    }
  }
}
";

/// Full nested state of one series, started games only
pub const SERIES_STATE: &str = r"
query SeriesState($id: ID!) {
  seriesState(id: $id) {
    valid
    updatedAt
    format
    started
    finished
    teams {
      id
      name
      won
      score
    }
    games(filter: { started: true }) {
      id
      sequenceNumber
      started
      startedAt
      finished
      finishedAt
      map { id name }
      teams {
        id
        name
        side
        won
        score
        players {
          id
          name
          kills
          deaths
          netWorth
          money
          position { x y }
        }
      }
    }
  }
}
";

/// Team metadata from the central data service
pub const TEAM: &str = r"
query GetTeam($teamId: ID!) {
  team(id: $teamId) {
    id
    name
    logoUrl
  }
}
";
