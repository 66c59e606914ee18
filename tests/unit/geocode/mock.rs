use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::foundation::core::Location;
use crate::foundation::error::{CityPaperError, CityPaperResult};
use crate::geocode::address::AddressFields;
use crate::geocode::nominatim::ReverseGeocoder;
use crate::net::BoxFuture;

/// Answers keyed by rounded coordinates, each after its own delay.
#[derive(Default)]
pub(crate) struct MockGeocoder {
    answers: HashMap<(i64, i64), (Duration, Option<AddressFields>)>,
    pub calls: Mutex<Vec<Location>>,
}

fn key(location: Location) -> (i64, i64) {
    (
        (location.lat() * 1e4).round() as i64,
        (location.lng() * 1e4).round() as i64,
    )
}

impl MockGeocoder {
    pub fn answer(mut self, location: Location, delay: Duration, city: &str) -> Self {
        let fields = AddressFields {
            city: Some(city.to_owned()),
            ..AddressFields::default()
        };
        self.answers.insert(key(location), (delay, Some(fields)));
        self
    }

    pub fn fail(mut self, location: Location, delay: Duration) -> Self {
        self.answers.insert(key(location), (delay, None));
        self
    }
}

impl ReverseGeocoder for MockGeocoder {
    fn reverse(&self, location: Location) -> BoxFuture<'_, CityPaperResult<AddressFields>> {
        self.calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(location);
        let answer = self.answers.get(&key(location)).cloned();
        Box::pin(async move {
            match answer {
                Some((delay, fields)) => {
                    tokio::time::sleep(delay).await;
                    fields.ok_or_else(|| CityPaperError::geocode_failed("mock outage"))
                }
                None => Err(CityPaperError::geocode_failed("no mock answer")),
            }
        })
    }
}
