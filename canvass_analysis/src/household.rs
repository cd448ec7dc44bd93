use log::debug;

use crate::collections::{aligned_column, required_column, Dict};
use crate::config::{column_names, AnalysisErrors, SheetContents};

/// Maps a record to the household (door) it belongs to.
///
/// The household id can be used to count doors rather than individuals.
pub trait Householding {
    /// None if the record was not part of the snapshot.
    fn household_id(&self, rec_id: &str) -> Option<&str>;
}

/// Householding based on the normalized street address of each record.
#[derive(Debug, Clone)]
pub struct HouseholdResolver {
    ids: Dict<String>,
}

impl HouseholdResolver {
    /// Builds the mapping from the `RecId`, `Address`, `City` and `Zip` columns.
    pub fn new(data: &SheetContents) -> Result<HouseholdResolver, AnalysisErrors> {
        let rec_ids = required_column(data, column_names::REC_ID)?;
        let addresses = aligned_column(data, column_names::ADDRESS, rec_ids.len())?;
        let cities = aligned_column(data, column_names::CITY, rec_ids.len())?;
        let zips = aligned_column(data, column_names::ZIP, rec_ids.len())?;

        let mut ids: Dict<String> = Dict::new();
        for (idx, rec_id) in rec_ids.iter().enumerate() {
            let hhid =
                HouseholdResolver::calc_household_id(&addresses[idx], &cities[idx], &zips[idx]);
            ids.add(rec_id.as_str(), hhid);
        }
        debug!("HouseholdResolver::new: {} records resolved", ids.len());
        Ok(HouseholdResolver { ids })
    }

    /// Same address, city and zip (ignoring case) means same household.
    pub fn calc_household_id(addr: &str, city: &str, zip: &str) -> String {
        format!("{}{}{}", addr, city, zip).to_lowercase()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl Householding for HouseholdResolver {
    fn household_id(&self, rec_id: &str) -> Option<&str> {
        self.ids.get(rec_id).map(|s| s.as_str())
    }
}
