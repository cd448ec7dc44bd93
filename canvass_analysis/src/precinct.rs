// Group by precinct

use log::{debug, info};

use crate::collections::{
    aligned_column, optional_column, percentage, required_column, KeyedCounter,
};
use crate::config::{column_names, AnalysisErrors, Dict, SheetContents};
use crate::household::{HouseholdResolver, Householding};

/// Party codes counted as republican.
const GOP_CODES: [&str; 2] = ["1", "2"];
/// Party codes counted as democrat.
const DEM_CODES: [&str; 2] = ["4", "5"];

/// Statistics for one precinct.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Precinct {
    pub name: String,
    /// Total people in the precinct.
    pub count: u64,
    pub households: KeyedCounter,
    pub gop_count: u64,
    pub dem_count: u64,
    /// Number of people contacted.
    pub contact_count: u64,
    pub contacted_households: KeyedCounter,
    /// Number of targeted people.
    pub targets: u64,
}

impl Precinct {
    pub fn new(name: &str) -> Precinct {
        Precinct {
            name: name.to_string(),
            count: 0,
            households: KeyedCounter::new(),
            gop_count: 0,
            dem_count: 0,
            contact_count: 0,
            contacted_households: KeyedCounter::new(),
            targets: 0,
        }
    }

    /// Share of republicans among the voters of the two main parties.
    pub fn gop_percentage(&self) -> String {
        percentage(self.gop_count, self.gop_count + self.dem_count)
    }

    /// Share of the households that have been contacted.
    pub fn contact_percentage(&self) -> String {
        percentage(
            self.contacted_households.count() as u64,
            self.households.count() as u64,
        )
    }

    /// Any code other than the GOP and DEM ones is ignored.
    pub fn apply_party(&mut self, code: &str) {
        if GOP_CODES.contains(&code) {
            self.gop_count += 1;
        } else if DEM_CODES.contains(&code) {
            self.dem_count += 1;
        }
    }
}

/// Builds the per-precinct statistics of a sheet.
///
/// Required columns: `RecId`, `PrecinctName`, `Party` and the address columns used for
/// householding. `XTargetPri` and `ResultOfContact` are optional.
pub fn build_precincts(data: &SheetContents) -> Result<Vec<Precinct>, AnalysisErrors> {
    let householder = HouseholdResolver::new(data)?;
    build_precincts_with(data, &householder)
}

/// Same as [`build_precincts`], with an existing householder.
pub fn build_precincts_with(
    data: &SheetContents,
    householder: &dyn Householding,
) -> Result<Vec<Precinct>, AnalysisErrors> {
    let rec_ids = required_column(data, column_names::REC_ID)?;
    let num_rows = rec_ids.len();
    let precincts = aligned_column(data, column_names::PRECINCT_NAME, num_rows)?;
    let party_column = aligned_column(data, column_names::PARTY, num_rows)?;
    let target_column = optional_column(data, column_names::X_TARGET_PRI, num_rows)?;
    let contacts = optional_column(data, column_names::RESULT_OF_CONTACT, num_rows)?;
    debug!(
        "build_precincts: {} rows, targets: {}, contacts: {}",
        num_rows,
        target_column.is_some(),
        contacts.is_some()
    );

    let mut list: Dict<Precinct> = Dict::new();
    for (i, rec_id) in rec_ids.iter().enumerate() {
        let precinct_name = &precincts[i];
        let p = list.get_or_insert_with(precinct_name, || Precinct::new(precinct_name));

        p.count += 1;

        let hhid = householder.household_id(rec_id).unwrap_or(rec_id);
        p.households.add(hhid);

        p.apply_party(&party_column[i]);

        if let Some(targets) = target_column {
            if targets[i] == "1" {
                p.targets += 1;
            }
        }

        if let Some(contacts) = contacts {
            if !contacts[i].is_empty() {
                p.contact_count += 1;
                p.contacted_households.add(hhid);
            }
        }
    }

    info!("build_precincts: {} rows in {} precincts", num_rows, list.len());
    Ok(list.into_values())
}

/// Lays out the precincts as a report, one row per precinct.
pub fn precincts_to_rectangle(precincts: &[Precinct]) -> SheetContents {
    let mut names: Vec<String> = Vec::new();
    let mut count: Vec<String> = Vec::new();
    let mut household_count: Vec<String> = Vec::new();
    let mut gop_count: Vec<String> = Vec::new();
    let mut dem_count: Vec<String> = Vec::new();
    let mut gop_percent: Vec<String> = Vec::new();
    let mut contact_count: Vec<String> = Vec::new();
    let mut contact_household_count: Vec<String> = Vec::new();
    let mut targets: Vec<String> = Vec::new();

    for p in precincts.iter() {
        names.push(p.name.clone());
        count.push(p.count.to_string());
        household_count.push(p.households.to_string());
        gop_count.push(p.gop_count.to_string());
        dem_count.push(p.dem_count.to_string());
        gop_percent.push(p.gop_percentage());
        contact_count.push(p.contact_count.to_string());
        contact_household_count.push(p.contacted_households.to_string());
        targets.push(p.targets.to_string());
    }

    let mut x = SheetContents::new();
    x.add("Names", names);
    x.add("count", count);
    x.add("HouseholdCount", household_count);
    x.add("GOPCount", gop_count);
    x.add("DEMCount", dem_count);
    x.add("GOPPercent", gop_percent);
    x.add("ContactCount", contact_count);
    x.add("ContactHouseholdCount", contact_household_count);
    x.add("Targets", targets);
    x
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(cols: &[(&str, &[&str])]) -> SheetContents {
        cols.iter()
            .map(|(n, vals)| (n.to_string(), vals.iter().map(|s| s.to_string()).collect()))
            .collect()
    }

    #[test]
    fn shared_address_is_one_household() {
        let data = sheet(&[
            ("RecId", &["r1", "r2"]),
            ("Address", &["12 Main St", "12 main st"]),
            ("City", &["Redmond", "Redmond"]),
            ("Zip", &["98052", "98052"]),
            ("PrecinctName", &["P1", "P1"]),
            ("Party", &["1", "1"]),
        ]);
        let precincts = build_precincts(&data).unwrap();
        assert_eq!(precincts.len(), 1);
        let p = &precincts[0];
        assert_eq!(p.name, "P1");
        assert_eq!(p.count, 2);
        assert_eq!(p.households.count(), 1);
        assert_eq!(p.gop_count, 2);
        assert_eq!(p.gop_percentage(), "100%");
        assert_eq!(p.targets, 0);
        assert_eq!(p.contact_count, 0);
        assert_eq!(p.contact_percentage(), "0%");
    }

    #[test]
    fn party_targets_and_contacts() {
        let data = sheet(&[
            ("RecId", &["r1", "r2", "r3", "r4", "r5", "r6"]),
            ("Address", &["1 A", "1 A", "2 B", "3 C", "4 D", "5 E"]),
            ("City", &["X", "X", "X", "X", "X", "X"]),
            ("Zip", &["1", "1", "1", "1", "1", "1"]),
            ("PrecinctName", &["P2", "P2", "P1", "P2", "P1", "P2"]),
            ("Party", &["2", "4", "5", "3", "", "1"]),
            ("XTargetPri", &["1", "0", "1", "", "1", "1"]),
            ("ResultOfContact", &["Home", "Home", "", "NotHome", "", ""]),
        ]);
        let precincts = build_precincts(&data).unwrap();
        assert_eq!(
            precincts.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            vec!["P2", "P1"]
        );
        let p2 = &precincts[0];
        assert_eq!(p2.count, 4);
        assert_eq!(p2.households.count(), 3);
        assert_eq!((p2.gop_count, p2.dem_count), (2, 1));
        assert_eq!(p2.gop_percentage(), "66.67%");
        assert_eq!(p2.targets, 2);
        assert_eq!(p2.contact_count, 3);
        assert_eq!(p2.contacted_households.count(), 2);
        assert_eq!(p2.contact_percentage(), "66.67%");

        let p1 = &precincts[1];
        assert_eq!((p1.gop_count, p1.dem_count), (0, 1));
        assert_eq!(p1.gop_percentage(), "0%");
        assert_eq!(p1.targets, 2);
        assert_eq!(p1.contact_count, 0);
    }

    #[test]
    fn no_party_means_na() {
        let mut p = Precinct::new("P9");
        p.apply_party("3");
        p.apply_party("");
        assert_eq!(p.gop_percentage(), "na");
        assert_eq!(p.contact_percentage(), "na");
    }

    #[test]
    fn missing_grouping_columns_fail() {
        let data = sheet(&[
            ("RecId", &["r1"]),
            ("Address", &["1 A"]),
            ("City", &["X"]),
            ("Zip", &["1"]),
            ("PrecinctName", &["P1"]),
        ]);
        assert_eq!(
            build_precincts(&data),
            Err(AnalysisErrors::MissingColumn {
                column: "Party".to_string()
            })
        );
    }

    #[test]
    fn report_layout() {
        let data = sheet(&[
            ("RecId", &["r1", "r2"]),
            ("Address", &["1 A", "2 B"]),
            ("City", &["X", "X"]),
            ("Zip", &["1", "1"]),
            ("PrecinctName", &["P1", "P2"]),
            ("Party", &["1", "4"]),
        ]);
        let rect = precincts_to_rectangle(&build_precincts(&data).unwrap());
        assert_eq!(
            rect.keys().collect::<Vec<_>>(),
            vec![
                "Names",
                "count",
                "HouseholdCount",
                "GOPCount",
                "DEMCount",
                "GOPPercent",
                "ContactCount",
                "ContactHouseholdCount",
                "Targets"
            ]
        );
        assert_eq!(rect.get("Names").unwrap(), &vec!["P1", "P2"]);
        assert_eq!(rect.get("GOPPercent").unwrap(), &vec!["100%", "0%"]);
        assert_eq!(rect.get("HouseholdCount").unwrap(), &vec!["1", "1"]);
    }
}
