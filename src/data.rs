use std::collections::BTreeMap;
use std::fmt;

use crate::error::{ScopeError, ScopeResult};

/// One observed (survey year, age) pair. Immutable after load.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DataPoint {
    pub year: i32,
    pub age: i32,
    pub income: f64,
}

impl DataPoint {
    pub fn birth_year(&self) -> i32 {
        self.year - self.age
    }
}

/// All observations sharing a birth year (`year - age`), sorted ascending by
/// survey year.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Cohort {
    pub birth_year: i32,
    pub points: Vec<DataPoint>,
}

impl Cohort {
    /// Observed age range of this cohort.
    pub fn age_extent(&self) -> (i32, i32) {
        let min = self.points.iter().map(|p| p.age).min().unwrap_or(0);
        let max = self.points.iter().map(|p| p.age).max().unwrap_or(0);
        (min, max)
    }
}

/// Generation label bands by birth year.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub enum Generation {
    Greatest,
    Silent,
    Boomer,
    GenX,
    Millennial,
}

impl Generation {
    pub fn for_birth_year(born: i32) -> Self {
        if born >= 1985 {
            Self::Millennial
        } else if born >= 1965 {
            Self::GenX
        } else if born >= 1945 {
            Self::Boomer
        } else if born >= 1925 {
            Self::Silent
        } else {
            Self::Greatest
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Greatest => "Greatest Generation",
            Self::Silent => "Silent Generation",
            Self::Boomer => "Boomer",
            Self::GenX => "Gen X",
            Self::Millennial => "Millennial",
        }
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The loaded dataset plus its one-time cohort projection.
#[derive(Clone, Debug)]
pub struct Dataset {
    points: Vec<DataPoint>,
    cohorts: Vec<Cohort>,
}

impl Dataset {
    /// Validates rows and builds the cohort grouping. Pure projection; the
    /// dataset is read-only afterwards.
    pub fn from_rows(rows: Vec<DataPoint>) -> ScopeResult<Self> {
        if rows.is_empty() {
            return Err(ScopeError::data("dataset has no rows"));
        }
        for (i, row) in rows.iter().enumerate() {
            if !row.income.is_finite() {
                return Err(ScopeError::data(format!(
                    "row {i}: income is not a finite number"
                )));
            }
            if row.age < 0 {
                return Err(ScopeError::data(format!("row {i}: negative age")));
            }
        }

        let mut groups: BTreeMap<i32, Vec<DataPoint>> = BTreeMap::new();
        for row in &rows {
            groups.entry(row.birth_year()).or_default().push(*row);
        }
        let cohorts = groups
            .into_iter()
            .map(|(birth_year, mut points)| {
                points.sort_by_key(|p| p.year);
                Cohort { birth_year, points }
            })
            .collect();

        Ok(Self {
            points: rows,
            cohorts,
        })
    }

    /// Parses `year,age,income` CSV text. Any malformed row is fatal: partial
    /// data must never reach the chart.
    pub fn parse_csv(text: &str) -> ScopeResult<Self> {
        let mut lines = text.lines().enumerate();

        let (_, header) = lines
            .next()
            .ok_or_else(|| ScopeError::data("empty CSV input"))?;
        let columns: Vec<&str> = header.split(',').map(str::trim).collect();
        if columns != ["year", "age", "income"] {
            return Err(ScopeError::data(format!(
                "unexpected CSV header '{header}', want 'year,age,income'"
            )));
        }

        let mut rows = Vec::new();
        for (lineno, line) in lines {
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            if fields.len() != 3 {
                return Err(ScopeError::data(format!(
                    "line {}: expected 3 fields, got {}",
                    lineno + 1,
                    fields.len()
                )));
            }
            let year: i32 = fields[0]
                .parse()
                .map_err(|_| ScopeError::data(format!("line {}: bad year", lineno + 1)))?;
            let age: i32 = fields[1]
                .parse()
                .map_err(|_| ScopeError::data(format!("line {}: bad age", lineno + 1)))?;
            let income: f64 = fields[2]
                .parse()
                .map_err(|_| ScopeError::data(format!("line {}: bad income", lineno + 1)))?;
            rows.push(DataPoint { year, age, income });
        }

        Self::from_rows(rows)
    }

    pub fn points(&self) -> &[DataPoint] {
        &self.points
    }

    pub fn cohorts(&self) -> &[Cohort] {
        &self.cohorts
    }

    pub fn cohort(&self, birth_year: i32) -> Option<&Cohort> {
        self.cohorts
            .binary_search_by_key(&birth_year, |c| c.birth_year)
            .ok()
            .map(|i| &self.cohorts[i])
    }

    /// (min, max) survey year across all rows.
    pub fn year_extent(&self) -> (i32, i32) {
        let min = self.points.iter().map(|p| p.year).min().unwrap_or(0);
        let max = self.points.iter().map(|p| p.year).max().unwrap_or(0);
        (min, max)
    }

    /// (min, max) age across all rows.
    pub fn age_extent(&self) -> (i32, i32) {
        let min = self.points.iter().map(|p| p.age).min().unwrap_or(0);
        let max = self.points.iter().map(|p| p.age).max().unwrap_or(0);
        (min, max)
    }

    pub fn income_max(&self) -> f64 {
        self.points.iter().map(|p| p.income).fold(0.0, f64::max)
    }

    /// The observation where this cohort's income peaked. Ties keep the
    /// earliest observation.
    pub fn peak_income(&self, birth_year: i32) -> Option<DataPoint> {
        let cohort = self.cohort(birth_year)?;
        let mut peak: Option<DataPoint> = None;
        for p in &cohort.points {
            if peak.is_none_or(|best| p.income > best.income) {
                peak = Some(*p);
            }
        }
        peak
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<DataPoint> {
        vec![
            DataPoint {
                year: 1981,
                age: 31,
                income: 52_000.0,
            },
            DataPoint {
                year: 1980,
                age: 30,
                income: 50_000.0,
            },
            DataPoint {
                year: 1950,
                age: 30,
                income: 20_000.0,
            },
        ]
    }

    #[test]
    fn groups_by_birth_year_and_sorts_by_survey_year() {
        let ds = Dataset::from_rows(rows()).unwrap();
        assert_eq!(ds.cohorts().len(), 2);

        let c1920 = ds.cohort(1920).unwrap();
        assert_eq!(c1920.points.len(), 1);

        let c1950 = ds.cohort(1950).unwrap();
        assert_eq!(c1950.points.len(), 2);
        assert_eq!(c1950.points[0].year, 1980);
        assert_eq!(c1950.points[1].year, 1981);
    }

    #[test]
    fn rejects_non_finite_income() {
        let mut bad = rows();
        bad[1].income = f64::NAN;
        assert!(matches!(
            Dataset::from_rows(bad),
            Err(ScopeError::Data(_))
        ));
    }

    #[test]
    fn rejects_empty_dataset() {
        assert!(Dataset::from_rows(Vec::new()).is_err());
    }

    #[test]
    fn parse_csv_round_trips_rows() {
        let ds = Dataset::parse_csv("year,age,income\n1980,30,50000\n1981,31,52000\n").unwrap();
        assert_eq!(ds.points().len(), 2);
        assert_eq!(ds.year_extent(), (1980, 1981));
        assert_eq!(ds.age_extent(), (30, 31));
        assert_eq!(ds.income_max(), 52_000.0);
    }

    #[test]
    fn parse_csv_rejects_malformed_row() {
        let err = Dataset::parse_csv("year,age,income\n1980,thirty,50000\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn parse_csv_rejects_wrong_header() {
        assert!(Dataset::parse_csv("a,b,c\n1,2,3\n").is_err());
    }

    #[test]
    fn peak_income_keeps_earliest_on_tie() {
        let ds = Dataset::from_rows(vec![
            DataPoint {
                year: 1980,
                age: 30,
                income: 50_000.0,
            },
            DataPoint {
                year: 1981,
                age: 31,
                income: 50_000.0,
            },
        ])
        .unwrap();
        let peak = ds.peak_income(1950).unwrap();
        assert_eq!(peak.year, 1980);
    }

    #[test]
    fn generation_bands() {
        assert_eq!(Generation::for_birth_year(1990), Generation::Millennial);
        assert_eq!(Generation::for_birth_year(1985), Generation::Millennial);
        assert_eq!(Generation::for_birth_year(1970), Generation::GenX);
        assert_eq!(Generation::for_birth_year(1950), Generation::Boomer);
        assert_eq!(Generation::for_birth_year(1930), Generation::Silent);
        assert_eq!(Generation::for_birth_year(1910), Generation::Greatest);
    }
}
