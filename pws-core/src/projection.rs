use tracing::debug;

use crate::{
    error::ObservationError,
    model::{AttributeMap, WeatherResponse},
    schema::{FieldNaming, Visit},
};

/// Output key of the observation time, in every naming mode.
pub const OBSERVATION_EPOCH_KEY: &str = "observation_epoch";

/// Build the flat attribute map for the requested field names.
///
/// Each name is first looked up as a native identifier (see
/// [`WeatherResponse::direct_field`]), then as an alias across every present
/// substructure. Both lookups may hit; a later hit overwrites an earlier one
/// with the same output key. Names that match nothing are skipped. The
/// observation epoch is always included under [`OBSERVATION_EPOCH_KEY`].
///
/// Values are copied as received; run [`crate::normalize`] on the result.
pub fn project<S: AsRef<str>>(
    requested: &[S],
    observation: &WeatherResponse,
    naming: FieldNaming,
) -> Result<AttributeMap, ObservationError> {
    let epoch = observation
        .timestamp
        .observation_epoch
        .as_ref()
        .ok_or(ObservationError::MissingTimestamp)?;

    let mut fields = AttributeMap::new();

    for name in requested {
        let name = name.as_ref();
        let mut found = 0;

        if let Some(hit) = observation.direct_field(name) {
            if let Some(value) = hit.value {
                fields.insert(hit.key(naming).to_string(), value.clone());
                found += 1;
            }
        }

        found += observation.collect_alias(name, naming, &mut fields);

        if found == 0 {
            debug!(field = name, "requested field not present in observation");
        } else if found > 1 {
            debug!(field = name, matches = found, "requested field matched more than once");
        }
    }

    fields.insert(OBSERVATION_EPOCH_KEY.to_string(), epoch.clone());

    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        DisplayLocation, FieldValue, ObservationLocation, ObservationTimestamp, Temperature, Wind,
    };

    fn temperature() -> Temperature {
        Temperature {
            description: "66.3 F (19.1 C)".into(),
            heat_index_string: "NA".into(),
            fahrenheit: FieldValue::Float(66.3),
            celsius: "19.1".into(),
            feels_like_fahrenheit: "66.3".into(),
            heat_index_fahrenheit: "NA".into(),
            feels_like_celsius: "19.1".into(),
            heat_index_celsius: "NA".into(),
        }
    }

    fn wind() -> Wind {
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

    fn observation() -> WeatherResponse {
        WeatherResponse {
            observation_location: ObservationLocation {
                city: Some("SOMA, San Francisco".into()),
                ..Default::default()
            },
            display_location: DisplayLocation {
                city: Some("San Francisco".into()),
                ..Default::default()
            },
            description: Some("Partly Cloudy".into()),
            temperature: Some(temperature()),
            precipitation: None,
            wind: Some(wind()),
            windchill: None,
            dewpoint: None,
            pressure: None,
            solar: None,
            visibility: None,
            timestamp: ObservationTimestamp {
                observation_time: Some("Last Updated on June 27, 5:27 PM PDT".into()),
                observation_epoch: Some("1340843233".into()),
                observation_time_rfc822: Some("Wed, 27 Jun 2012 17:27:13 -0700".into()),
            },
        }
    }

    #[test]
    fn resolves_aliases_and_skips_unknown_names() {
        let fields =
            project(&["temp_f", "wind_dir", "bogus_field"], &observation(), FieldNaming::Alias)
                .unwrap();

        assert_eq!(fields.len(), 3);
        assert_eq!(fields["temp_f"], FieldValue::Float(66.3));
        assert_eq!(fields["wind_dir"], FieldValue::from("NNW"));
        assert_eq!(fields[OBSERVATION_EPOCH_KEY], FieldValue::from("1340843233"));
        assert!(!fields.contains_key("bogus_field"));
    }

    #[test]
    fn absent_substructure_contributes_nothing() {
        let mut obs = observation();
        obs.wind = None;

        let fields = project(&["temp_f", "wind_dir", "bogus_field"], &obs, FieldNaming::Alias)
            .expect("absent groups are not an error");

        assert_eq!(fields.len(), 2);
        assert!(!fields.contains_key("wind_dir"));
        assert!(!fields.contains_key("direction"));
    }

    #[test]
    fn native_naming_uses_rust_identifiers() {
        let fields = project(&["temp_f", "wind_gust_mph"], &observation(), FieldNaming::Native)
            .unwrap();

        assert_eq!(fields["fahrenheit"], FieldValue::Float(66.3));
        assert_eq!(fields["gust_mph"], FieldValue::from("28.0"));
        assert!(!fields.contains_key("temp_f"));
    }

    #[test]
    fn direct_native_lookup_follows_naming_mode() {
        let obs = observation();

        let alias = project(&["description"], &obs, FieldNaming::Alias).unwrap();
        assert_eq!(alias["weather"], FieldValue::from("Partly Cloudy"));

        let native = project(&["description"], &obs, FieldNaming::Native).unwrap();
        assert_eq!(native["description"], FieldValue::from("Partly Cloudy"));
    }

    #[test]
    fn group_native_names_are_looked_up_directly() {
        let obs = observation();

        let native = project(&["gust_mph", "direction"], &obs, FieldNaming::Native).unwrap();
        assert_eq!(native["gust_mph"], FieldValue::from("28.0"));
        assert_eq!(native["direction"], FieldValue::from("NNW"));

        let alias = project(&["gust_mph"], &obs, FieldNaming::Alias).unwrap();
        assert_eq!(alias["wind_gust_mph"], FieldValue::from("28.0"));
        assert!(!alias.contains_key("gust_mph"));
    }

    #[test]
    fn group_native_name_in_absent_group_is_skipped() {
        let mut obs = observation();
        obs.wind = None;

        let fields = project(&["gust_mph"], &obs, FieldNaming::Native)
            .expect("absent groups are not an error");
        assert_eq!(fields.len(), 1);
        assert!(!fields.contains_key("gust_mph"));
    }

    #[test]
    fn shared_native_names_need_an_alias() {
        // Temperature and dewpoint both own `fahrenheit`.
        let fields = project(&["fahrenheit"], &observation(), FieldNaming::Native).unwrap();
        assert_eq!(fields.len(), 1);
    }

    #[test]
    fn direct_and_alias_hits_share_the_output_key() {
        // "observation_time" is both a native identifier and an alias.
        let fields = project(&["observation_time"], &observation(), FieldNaming::Alias).unwrap();

        assert_eq!(fields.len(), 2);
        assert_eq!(
            fields["observation_time"],
            FieldValue::from("Last Updated on June 27, 5:27 PM PDT")
        );
    }

    #[test]
    fn repeated_alias_across_groups_keeps_the_last_one() {
        // Both location groups carry `city`; display_location is visited last.
        let fields = project(&["city"], &observation(), FieldNaming::Alias).unwrap();
        assert_eq!(fields["city"], FieldValue::from("San Francisco"));
    }

    #[test]
    fn native_name_collision_across_groups_keeps_the_last_one() {
        let mut obs = observation();
        obs.dewpoint = Some(crate::model::Dewpoint {
            description: "54 F (12 C)".into(),
            fahrenheit: FieldValue::Integer(54),
            celsius: FieldValue::Integer(12),
        });

        let fields = project(&["temp_f", "dewpoint_f"], &obs, FieldNaming::Native).unwrap();

        // Both map to `fahrenheit`; dewpoint was requested last.
        assert_eq!(fields["fahrenheit"], FieldValue::Integer(54));
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn timestamp_is_always_present_and_wins_over_requests() {
        let fields = project::<&str>(&[], &observation(), FieldNaming::Native).unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[OBSERVATION_EPOCH_KEY], FieldValue::from("1340843233"));

        let fields = project(&["observation_epoch"], &observation(), FieldNaming::Native).unwrap();
        assert_eq!(fields.len(), 1);
    }

    #[test]
    fn missing_timestamp_is_fatal() {
        let mut obs = observation();
        obs.timestamp.observation_epoch = None;

        let err = project(&["temp_f"], &obs, FieldNaming::Alias).unwrap_err();
        assert_eq!(err, ObservationError::MissingTimestamp);
    }

    #[test]
    fn duplicate_requests_are_harmless() {
        let fields = project(&["temp_f", "temp_f"], &observation(), FieldNaming::Alias).unwrap();
        assert_eq!(fields.len(), 2);
    }
}
