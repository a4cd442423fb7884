//! Static field tables for the observation schema.
//!
//! Every scalar attribute has two names: the Rust field identifier (its
//! native name) and the JSON key the conditions API uses (its alias). The
//! tables below map both names to an accessor, and [`Visit`] walks the
//! observation in a fixed order so lookups behave the same on every run.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::model::{
    AttributeMap, Dewpoint, DisplayLocation, FieldValue, ObservationLocation, ObservationTimestamp,
    Precipitation, Pressure, Solar, Temperature, Visibility, WeatherResponse, Wind, Windchill,
};

/// Which of the two names is used as the output key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldNaming {
    /// JSON keys as sent by the API, e.g. `temp_f`.
    #[default]
    Alias,
    /// Rust field identifiers, e.g. `fahrenheit`.
    Native,
}

impl FieldNaming {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldNaming::Alias => "alias",
            FieldNaming::Native => "native",
        }
    }
}

impl fmt::Display for FieldNaming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldNaming {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "alias" | "json" => Ok(FieldNaming::Alias),
            "native" => Ok(FieldNaming::Native),
            _ => Err(anyhow::anyhow!(
                "Unknown field naming '{value}'. Supported values: alias, native."
            )),
        }
    }
}

/// One scalar attribute of a substructure `T`.
pub struct Field<T> {
    pub name: &'static str,
    pub alias: &'static str,
    pub get: fn(&T) -> Option<&FieldValue>,
}

impl<T> Field<T> {
    pub fn key(&self, naming: FieldNaming) -> &'static str {
        match naming {
            FieldNaming::Alias => self.alias,
            FieldNaming::Native => self.name,
        }
    }
}

/// A group of scalar attributes with a fixed field table.
pub trait Section: Sized + 'static {
    const NAME: &'static str;
    const FIELDS: &'static [Field<Self>];
}

/// Alias lookup over a (possibly composite) substructure.
pub trait Visit {
    /// Insert every scalar whose alias equals `alias` into `out`, returning
    /// how many were found. Later matches overwrite earlier ones that share
    /// an output key.
    fn collect_alias(&self, alias: &str, naming: FieldNaming, out: &mut AttributeMap) -> usize;
}

impl<T: Section> Visit for T {
    fn collect_alias(&self, alias: &str, naming: FieldNaming, out: &mut AttributeMap) -> usize {
        let mut found = 0;
        for field in T::FIELDS.iter().filter(|f| f.alias == alias) {
            if let Some(value) = (field.get)(self) {
                out.insert(field.key(naming).to_string(), value.clone());
                found += 1;
            }
        }
        found
    }
}

impl WeatherResponse {
    const OWN_FIELDS: &'static [Field<WeatherResponse>] =
        &[Field { name: "description", alias: "weather", get: |w| w.description.as_ref() }];

    /// Instrument groups in traversal order; absent ones are `None`.
    pub fn optional_sections(&self) -> [Option<&dyn Visit>; 8] {
        [
            self.temperature.as_ref().map(|s| s as &dyn Visit),
            self.precipitation.as_ref().map(|s| s as &dyn Visit),
            self.wind.as_ref().map(|s| s as &dyn Visit),
            self.windchill.as_ref().map(|s| s as &dyn Visit),
            self.dewpoint.as_ref().map(|s| s as &dyn Visit),
            self.pressure.as_ref().map(|s| s as &dyn Visit),
            self.solar.as_ref().map(|s| s as &dyn Visit),
            self.visibility.as_ref().map(|s| s as &dyn Visit),
        ]
    }

    /// Look up a native identifier on the observation itself.
    ///
    /// The observation's own scalars come first. Otherwise the name must
    /// belong to exactly one substructure; names shared by several of them
    /// (`fahrenheit`, `city`, `description`) never resolve here. A hit in an
    /// absent group carries no value.
    pub fn direct_field(&self, name: &str) -> Option<DirectHit<'_>> {
        if let Some(field) = Self::OWN_FIELDS.iter().find(|f| f.name == name) {
            return Some(DirectHit { name: field.name, alias: field.alias, value: (field.get)(self) });
        }

        let mut hits = [
            direct_in(Some(&self.observation_location), name),
            direct_in(Some(&self.display_location), name),
            direct_in(self.temperature.as_ref(), name),
            direct_in(self.precipitation.as_ref(), name),
            direct_in(self.wind.as_ref(), name),
            direct_in(self.windchill.as_ref(), name),
            direct_in(self.dewpoint.as_ref(), name),
            direct_in(self.pressure.as_ref(), name),
            direct_in(self.solar.as_ref(), name),
            direct_in(self.visibility.as_ref(), name),
            direct_in(Some(&self.timestamp), name),
        ]
        .into_iter()
        .flatten();

        match (hits.next(), hits.next()) {
            (Some(hit), None) => Some(hit),
            _ => None,
        }
    }
}

/// A native-name match on the observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectHit<'a> {
    pub name: &'static str,
    pub alias: &'static str,
    /// `None` when the owning group is absent.
    pub value: Option<&'a FieldValue>,
}

impl DirectHit<'_> {
    pub fn key(&self, naming: FieldNaming) -> &'static str {
        match naming {
            FieldNaming::Alias => self.alias,
            FieldNaming::Native => self.name,
        }
    }
}

fn direct_in<'a, T: Section>(group: Option<&'a T>, name: &str) -> Option<DirectHit<'a>> {
    T::FIELDS.iter().find(|f| f.name == name).map(|f| DirectHit {
        name: f.name,
        alias: f.alias,
        value: group.and_then(|g| (f.get)(g)),
    })
}

impl Visit for WeatherResponse {
    fn collect_alias(&self, alias: &str, naming: FieldNaming, out: &mut AttributeMap) -> usize {
        let mut found = self.observation_location.collect_alias(alias, naming, out);
        found += self.display_location.collect_alias(alias, naming, out);

        for field in Self::OWN_FIELDS.iter().filter(|f| f.alias == alias) {
            if let Some(value) = (field.get)(self) {
                out.insert(field.key(naming).to_string(), value.clone());
                found += 1;
            }
        }

        for section in self.optional_sections().into_iter().flatten() {
            found += section.collect_alias(alias, naming, out);
        }

        found + self.timestamp.collect_alias(alias, naming, out)
    }
}

/// A row of the field catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    pub section: &'static str,
    pub name: &'static str,
    pub alias: &'static str,
}

fn entries<T: Section>() -> impl Iterator<Item = CatalogEntry> {
    T::FIELDS.iter().map(|f| CatalogEntry { section: T::NAME, name: f.name, alias: f.alias })
}

/// Every requestable attribute, in traversal order.
pub fn field_catalog() -> Vec<CatalogEntry> {
    let own = WeatherResponse::OWN_FIELDS
        .iter()
        .map(|f| CatalogEntry { section: "observation", name: f.name, alias: f.alias });

    entries::<ObservationLocation>()
        .chain(entries::<DisplayLocation>())
        .chain(own)
        .chain(entries::<Temperature>())
        .chain(entries::<Precipitation>())
        .chain(entries::<Wind>())
        .chain(entries::<Windchill>())
        .chain(entries::<Dewpoint>())
        .chain(entries::<Pressure>())
        .chain(entries::<Solar>())
        .chain(entries::<Visibility>())
        .chain(entries::<ObservationTimestamp>())
        .collect()
}

impl Section for ObservationLocation {
    const NAME: &'static str = "observation_location";
    const FIELDS: &'static [Field<Self>] = &[
        Field { name: "city", alias: "city", get: |l| l.city.as_ref() },
        Field { name: "full", alias: "full", get: |l| l.full.as_ref() },
        Field { name: "elevation", alias: "elevation", get: |l| l.elevation.as_ref() },
        Field { name: "country", alias: "country", get: |l| l.country.as_ref() },
        Field { name: "longitude", alias: "longitude", get: |l| l.longitude.as_ref() },
        Field { name: "state", alias: "state", get: |l| l.state.as_ref() },
        Field {
            name: "country_iso3166",
            alias: "country_iso3166",
            get: |l| l.country_iso3166.as_ref(),
        },
        Field { name: "latitude", alias: "latitude", get: |l| l.latitude.as_ref() },
    ];
}

impl Section for DisplayLocation {
    const NAME: &'static str = "display_location";
    const FIELDS: &'static [Field<Self>] = &[
        Field { name: "city", alias: "city", get: |l| l.city.as_ref() },
        Field { name: "full", alias: "full", get: |l| l.full.as_ref() },
        Field { name: "magic", alias: "magic", get: |l| l.magic.as_ref() },
        Field { name: "state_name", alias: "state_name", get: |l| l.state_name.as_ref() },
        Field { name: "zip", alias: "zip", get: |l| l.zip.as_ref() },
        Field { name: "country", alias: "country", get: |l| l.country.as_ref() },
        Field { name: "longitude", alias: "longitude", get: |l| l.longitude.as_ref() },
        Field { name: "state", alias: "state", get: |l| l.state.as_ref() },
        Field { name: "wmo", alias: "wmo", get: |l| l.wmo.as_ref() },
        Field {
            name: "country_iso3166",
            alias: "country_iso3166",
            get: |l| l.country_iso3166.as_ref(),
        },
        Field { name: "latitude", alias: "latitude", get: |l| l.latitude.as_ref() },
        Field { name: "elevation", alias: "elevation", get: |l| l.elevation.as_ref() },
    ];
}

impl Section for Temperature {
    const NAME: &'static str = "temperature";
    const FIELDS: &'static [Field<Self>] = &[
        Field { name: "description", alias: "temperature_string", get: |t| Some(&t.description) },
        Field {
            name: "heat_index_string",
            alias: "heat_index_string",
            get: |t| Some(&t.heat_index_string),
        },
        Field { name: "fahrenheit", alias: "temp_f", get: |t| Some(&t.fahrenheit) },
        Field { name: "celsius", alias: "temp_c", get: |t| Some(&t.celsius) },
        Field {
            name: "feels_like_fahrenheit",
            alias: "feelslike_f",
            get: |t| Some(&t.feels_like_fahrenheit),
        },
        Field {
            name: "heat_index_fahrenheit",
            alias: "heat_index_f",
            get: |t| Some(&t.heat_index_fahrenheit),
        },
        Field {
            name: "feels_like_celsius",
            alias: "feelslike_c",
            get: |t| Some(&t.feels_like_celsius),
        },
        Field {
            name: "heat_index_celsius",
            alias: "heat_index_c",
            get: |t| Some(&t.heat_index_celsius),
        },
    ];
}

impl Section for Precipitation {
    const NAME: &'static str = "precipitation";
    const FIELDS: &'static [Field<Self>] = &[
        Field { name: "description", alias: "precip_today_string", get: |p| Some(&p.description) },
        Field { name: "today_metric", alias: "precip_today_metric", get: |p| Some(&p.today_metric) },
        Field { name: "today_in", alias: "precip_today_in", get: |p| Some(&p.today_in) },
        Field {
            name: "one_hour_string",
            alias: "precip_1hr_string",
            get: |p| Some(&p.one_hour_string),
        },
        Field {
            name: "one_hour_metric",
            alias: "precip_1hr_metric",
            get: |p| Some(&p.one_hour_metric),
        },
        Field { name: "one_hour_in", alias: "precip_1hr_in", get: |p| Some(&p.one_hour_in) },
        Field {
            name: "relative_humidity",
            alias: "relative_humidity",
            get: |p| Some(&p.relative_humidity),
        },
    ];
}

impl Section for Wind {
    const NAME: &'static str = "wind";
    const FIELDS: &'static [Field<Self>] = &[
        Field { name: "description", alias: "wind_string", get: |w| Some(&w.description) },
        Field { name: "direction", alias: "wind_dir", get: |w| Some(&w.direction) },
        Field { name: "degrees", alias: "wind_degrees", get: |w| Some(&w.degrees) },
        Field { name: "mph", alias: "wind_mph", get: |w| Some(&w.mph) },
        Field { name: "gust_mph", alias: "wind_gust_mph", get: |w| Some(&w.gust_mph) },
        Field { name: "kph", alias: "wind_kph", get: |w| Some(&w.kph) },
        Field { name: "gust_kph", alias: "wind_gust_kph", get: |w| Some(&w.gust_kph) },
    ];
}

impl Section for Windchill {
    const NAME: &'static str = "windchill";
    const FIELDS: &'static [Field<Self>] = &[
        Field { name: "description", alias: "windchill_string", get: |w| Some(&w.description) },
        Field { name: "fahrenheit", alias: "windchill_f", get: |w| Some(&w.fahrenheit) },
        Field { name: "celsius", alias: "windchill_c", get: |w| Some(&w.celsius) },
    ];
}

impl Section for Dewpoint {
    const NAME: &'static str = "dewpoint";
    const FIELDS: &'static [Field<Self>] = &[
        Field { name: "description", alias: "dewpoint_string", get: |d| Some(&d.description) },
        Field { name: "fahrenheit", alias: "dewpoint_f", get: |d| Some(&d.fahrenheit) },
        Field { name: "celsius", alias: "dewpoint_c", get: |d| Some(&d.celsius) },
    ];
}

impl Section for Pressure {
    const NAME: &'static str = "pressure";
    const FIELDS: &'static [Field<Self>] = &[
        Field { name: "trend", alias: "pressure_trend", get: |p| Some(&p.trend) },
        Field { name: "inches", alias: "pressure_in", get: |p| Some(&p.inches) },
        Field { name: "millibars", alias: "pressure_mb", get: |p| Some(&p.millibars) },
    ];
}

impl Section for Solar {
    const NAME: &'static str = "solar";
    const FIELDS: &'static [Field<Self>] = &[
        Field { name: "radiation", alias: "solarradiation", get: |s| Some(&s.radiation) },
        Field { name: "uv", alias: "UV", get: |s| Some(&s.uv) },
    ];
}

impl Section for Visibility {
    const NAME: &'static str = "visibility";
    const FIELDS: &'static [Field<Self>] = &[
        Field { name: "kilometers", alias: "visibility_km", get: |v| Some(&v.kilometers) },
        Field { name: "miles", alias: "visibility_mi", get: |v| Some(&v.miles) },
    ];
}

impl Section for ObservationTimestamp {
    const NAME: &'static str = "timestamp";
    const FIELDS: &'static [Field<Self>] = &[
        Field {
            name: "observation_time",
            alias: "observation_time",
            get: |t| t.observation_time.as_ref(),
        },
        Field {
            name: "observation_epoch",
            alias: "observation_epoch",
            get: |t| t.observation_epoch.as_ref(),
        },
        Field {
            name: "observation_time_rfc822",
            alias: "observation_time_rfc822",
            get: |t| t.observation_time_rfc822.as_ref(),
        },
    ];
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn naming_parses_case_insensitively() {
        assert_eq!("Native".parse::<FieldNaming>().unwrap(), FieldNaming::Native);
        assert_eq!("alias".parse::<FieldNaming>().unwrap(), FieldNaming::Alias);
        let err = "camel".parse::<FieldNaming>().unwrap_err();
        assert!(err.to_string().contains("Unknown field naming"));
    }

    #[test]
    fn aliases_are_unique_within_each_section() {
        let catalog = field_catalog();
        let mut seen = HashSet::new();
        for entry in &catalog {
            assert!(
                seen.insert((entry.section, entry.alias)),
                "duplicate alias {} in {}",
                entry.alias,
                entry.section
            );
        }
    }

    #[test]
    fn catalog_lists_groups_in_traversal_order() {
        let sections: Vec<_> = field_catalog().iter().map(|e| e.section).collect();
        let first = |name: &str| sections.iter().position(|s| *s == name).unwrap();

        assert!(first("display_location") < first("observation"));
        assert!(first("observation") < first("temperature"));
        assert!(first("temperature") < first("wind"));
        assert!(first("visibility") < first("timestamp"));
    }

    fn gusty() -> Wind {
        Wind {
            description: "From the NNW at 22.0 MPH".into(),
            direction: "NNW".into(),
            degrees: FieldValue::Integer(346),
            mph: FieldValue::Float(22.0),
            gust_mph: "28.0".into(),
            kph: FieldValue::Float(35.4),
            gust_kph: "45.1".into(),
        }
    }

    fn bare() -> WeatherResponse {
        WeatherResponse {
            observation_location: ObservationLocation::default(),
            display_location: DisplayLocation::default(),
            description: Some("Clear".into()),
            temperature: None,
            precipitation: None,
            wind: None,
            windchill: None,
            dewpoint: None,
            pressure: None,
            solar: None,
            visibility: None,
            timestamp: ObservationTimestamp {
                observation_epoch: Some("1340843233".into()),
                ..Default::default()
            },
        }
    }

    #[test]
    fn group_native_name_resolves_when_group_present() {
        let mut obs = bare();
        obs.wind = Some(gusty());

        let hit = obs.direct_field("gust_mph").expect("gust_mph is unique to wind");
        assert_eq!(hit.value, Some(&FieldValue::from("28.0")));
        assert_eq!(hit.key(FieldNaming::Alias), "wind_gust_mph");
        assert_eq!(hit.key(FieldNaming::Native), "gust_mph");
    }

    #[test]
    fn group_native_name_has_no_value_when_group_absent() {
        let bare_obs = bare();
        let hit = bare_obs.direct_field("gust_mph").expect("name is still known");
        assert_eq!(hit.value, None);
    }

    #[test]
    fn shared_native_names_are_not_direct() {
        let mut obs = bare();
        obs.wind = Some(gusty());

        assert!(obs.direct_field("fahrenheit").is_none());
        assert!(obs.direct_field("celsius").is_none());
        assert!(obs.direct_field("city").is_none());
        assert!(obs.direct_field("weather").is_none());
        assert!(obs.direct_field("bogus_field").is_none());
    }

    #[test]
    fn own_description_wins_over_group_descriptions() {
        let mut obs = bare();
        obs.wind = Some(gusty());

        let hit = obs.direct_field("description").unwrap();
        assert_eq!(hit.value, Some(&FieldValue::from("Clear")));
        assert_eq!(hit.key(FieldNaming::Alias), "weather");
    }

    #[test]
    fn unique_location_names_resolve_directly() {
        let mut obs = bare();
        obs.display_location.zip = Some("94107".into());

        let hit = obs.direct_field("zip").unwrap();
        assert_eq!(hit.value, Some(&FieldValue::from("94107")));
        assert_eq!(bare().direct_field("zip").unwrap().value, None);
    }

    #[test]
    fn timestamp_names_resolve_directly() {
        let bare_obs = bare();
        let hit = bare_obs.direct_field("observation_epoch").unwrap();
        assert_eq!(hit.value, Some(&FieldValue::from("1340843233")));
    }
}
