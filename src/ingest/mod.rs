/// Upstream data source clients.
///
/// Each external API gets its own file: URL construction, response parsing,
/// and the fetch call live together so the parsing can be tested against
/// fixtures without a network.

pub mod open_meteo;

#[cfg(test)]
pub(crate) mod fixtures;
