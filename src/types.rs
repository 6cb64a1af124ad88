//! Shared value types for listings and reviews
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

#[derive(
    minicbor::Encode, minicbor::Decode, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    #[n(0)]
    Donor,
    #[n(1)]
    Ngo,
    #[n(2)]
    Admin,
    #[n(3)]
    Volunteer,
}

#[derive(
    minicbor::Encode, minicbor::Decode, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum FoodCategory {
    #[n(0)]
    #[serde(rename = "Cooked Meals")]
    Cooked,
    #[n(1)]
    #[serde(rename = "Bakery & Sweets")]
    Bakery,
    #[n(2)]
    #[serde(rename = "Fresh Produce")]
    Produce,
    #[n(3)]
    #[serde(rename = "Packaged Goods")]
    Packaged,
    #[n(4)]
    #[serde(rename = "Dairy & Eggs")]
    Dairy,
}

#[derive(
    minicbor::Encode, minicbor::Decode, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum DonorType {
    #[n(0)]
    Restaurant,
    #[n(1)]
    Hotel,
    #[n(2)]
    Event,
    #[n(3)]
    Household,
}

#[derive(
    minicbor::Encode, minicbor::Decode, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum FreshnessStatus {
    #[n(0)]
    Fresh,
    #[n(1)]
    #[serde(rename = "Use Soon")]
    UseSoon,
    #[n(2)]
    Urgent,
}

#[derive(
    minicbor::Encode, minicbor::Decode, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum RecipientGroup {
    #[n(0)]
    Children,
    #[n(1)]
    Elderly,
    #[n(2)]
    #[serde(rename = "Pregnant Women")]
    PregnantWomen,
    #[n(3)]
    #[serde(rename = "General Public")]
    General,
    #[n(4)]
    #[serde(rename = "High Activity")]
    Athletes,
}

#[derive(minicbor::Encode, minicbor::Decode, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Location {
    #[n(0)]
    pub address: String,
    #[n(1)]
    pub lat: f64,
    #[n(2)]
    pub lng: f64,
}

#[derive(
    minicbor::Encode, minicbor::Decode, Serialize, Deserialize, Debug, Clone, Default, PartialEq,
)]
pub struct NutritionInfo {
    #[n(0)]
    pub calories: u32,
    #[n(1)]
    pub protein: u32,
    #[n(2)]
    pub carbs: u32,
    #[n(3)]
    pub fats: u32,
    #[n(4)]
    pub allergens: Vec<String>,
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeStamp(DateTime<Utc>);

impl TimeStamp {
    pub fn new() -> Self {
        Self(Utc::now())
    }
    /// Returns `None` for an impossible calendar date.
    pub fn new_with(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        min: u32,
        sec: u32,
    ) -> Option<Self> {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .single()
            .map(Self)
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

impl Default for TimeStamp {
    fn default() -> Self {
        Self::new()
    }
}

impl From<DateTime<Utc>> for TimeStamp {
    fn from(value: DateTime<Utc>) -> Self {
        TimeStamp(value)
    }
}

impl<C> minicbor::Encode<C> for TimeStamp {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}
