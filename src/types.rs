use serde::{Deserialize, Serialize};

/// Population categories carried by the census table, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PopulationCategory {
    White,
    Black,
    Hispanic,
    Asian,
    Other,
}

impl PopulationCategory {
    pub const ALL: [PopulationCategory; 5] = [
        PopulationCategory::White,
        PopulationCategory::Black,
        PopulationCategory::Hispanic,
        PopulationCategory::Asian,
        PopulationCategory::Other,
    ];

    /// Census column holding the absolute count for this category.
    pub fn column(self) -> &'static str {
        match self {
            PopulationCategory::White => "White",
            PopulationCategory::Black => "Black",
            PopulationCategory::Hispanic => "Hispanic",
            PopulationCategory::Asian => "Asian",
            PopulationCategory::Other => "Other",
        }
    }

    /// Output column holding the derived percentage.
    pub fn percentage_column(self) -> &'static str {
        match self {
            PopulationCategory::White => "White_Percentage",
            PopulationCategory::Black => "Black_Percentage",
            PopulationCategory::Hispanic => "Hispanic_Percentage",
            PopulationCategory::Asian => "Asian_Percentage",
            PopulationCategory::Other => "Other_Percentage",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// One value per [`PopulationCategory`], always iterated in declared order.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CategoryValues<T> {
    values: [T; 5],
}

impl<T> CategoryValues<T> {
    pub fn from_fn(mut f: impl FnMut(PopulationCategory) -> T) -> Self {
        Self {
            values: PopulationCategory::ALL.map(&mut f),
        }
    }

    pub fn get(&self, category: PopulationCategory) -> &T {
        &self.values[category.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (PopulationCategory, &T)> {
        PopulationCategory::ALL.into_iter().zip(self.values.iter())
    }
}

/// A voter row as loaded from the roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoterRecord {
    pub voter_id: String,
    pub name: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
}

impl VoterRecord {
    /// Address text handed to the geocoder: `street, city, state`.
    pub fn formatted_address(&self) -> String {
        format!("{}, {}, {}", self.street, self.city, self.state)
    }
}

/// A validated WGS84 position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

impl Coordinate {
    /// Returns `None` unless both values are finite and in range.
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        let lat_ok = latitude.is_finite() && (-90.0..=90.0).contains(&latitude);
        let lng_ok = longitude.is_finite() && (-180.0..=180.0).contains(&longitude);
        (lat_ok && lng_ok).then_some(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// Voter after address resolution. `coordinate` is `None` when the address
/// could not be resolved, which is an expected outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeocodedVoter {
    pub voter: VoterRecord,
    pub coordinate: Option<Coordinate>,
}

/// Census population counts for one postal code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRecord {
    pub zip: String,
    pub counts: CategoryValues<Option<f64>>,
    pub total_population: Option<f64>,
}

/// A geocoded voter left-joined with its census row, if any.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedRecord {
    pub voter: GeocodedVoter,
    pub reference: Option<ReferenceRecord>,
}

/// An enriched record with one derived percentage per category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalRecord {
    pub enriched: EnrichedRecord,
    pub percentages: CategoryValues<Option<f64>>,
}

impl FinalRecord {
    pub fn voter(&self) -> &VoterRecord {
        &self.enriched.voter.voter
    }

    pub fn coordinate(&self) -> Option<Coordinate> {
        self.enriched.voter.coordinate
    }

    pub fn reference(&self) -> Option<&ReferenceRecord> {
        self.enriched.reference.as_ref()
    }
}
