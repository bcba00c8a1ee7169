//! Region catalogue

/// A market region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// Lookup key used in configuration and on the command line
    pub key: &'static str,
    pub id: u64,
    pub name: &'static str,
    /// Base name of the CSV file for single-region pulls
    pub file_name: &'static str,
    /// Also covered by the Adam4Eve data set
    pub a4e: bool,
}

pub const REGIONS: &[Region] = &[
    Region { key: "forge", id: 10000002, name: "The Forge", file_name: "eve_market_the_forge", a4e: true },
    Region { key: "domain", id: 10000043, name: "Domain", file_name: "eve_market_domain", a4e: true },
    Region { key: "sinq_laison", id: 10000032, name: "Sinq Laison", file_name: "eve_market_sinq_laison", a4e: true },
    Region { key: "delve", id: 10000060, name: "Delve", file_name: "eve_market_delve", a4e: false },
    Region { key: "lonetrek", id: 10000016, name: "Lonetrek", file_name: "eve_market_lonetrek", a4e: false },
    Region { key: "perrigen_falls", id: 10000066, name: "Perrigen Falls", file_name: "eve_market_perrigen_falls", a4e: false },
    Region { key: "metropolis", id: 10000042, name: "Metropolis", file_name: "eve_market_metropolis", a4e: false },
    Region { key: "heimatar", id: 10000030, name: "Heimatar", file_name: "eve_market_heimatar", a4e: false },
    Region { key: "vale_of_the_silent", id: 10000003, name: "Vale of the Silent", file_name: "eve_market_vale_of_the_silent", a4e: false },
    Region { key: "fountain", id: 10000058, name: "Fountain", file_name: "eve_market_fountain", a4e: false },
];

/// File base name for pulls across every A4E region
pub const ALL_A4E_FILE_NAME: &str = "eve_market_all_a4e_regions";

/// Look a region up by key, case-insensitively
pub fn find_region(key: &str) -> Option<&'static Region> {
    let key = key.trim();
    REGIONS.iter().find(|r| r.key.eq_ignore_ascii_case(key))
}

/// The Forge, Sinq Laison and Domain, in pull order
pub fn a4e_regions() -> impl Iterator<Item = &'static Region> {
    ["forge", "sinq_laison", "domain"]
        .into_iter()
        .filter_map(find_region)
}
