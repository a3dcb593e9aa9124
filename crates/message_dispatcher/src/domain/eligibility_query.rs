use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use common::domain::{Query, FIRST_SEEN_ATTRIBUTE};

/// Builds the predicates sent to the inventory service.
///
/// Every predicate bounds `firstSeen` strictly before one frozen instant, so a
/// device registering mid-walk can neither shift page boundaries nor be picked
/// up halfway through a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EligibilityQueryComposer {
    not_after: DateTime<Utc>,
}

impl EligibilityQueryComposer {
    /// Freeze eligibility at the current instant, truncated to milliseconds
    pub fn starting_now() -> Self {
        Self::at(Utc::now().trunc_subsecs(3))
    }

    pub fn at(not_after: DateTime<Utc>) -> Self {
        Self { not_after }
    }

    pub fn not_after(&self) -> DateTime<Utc> {
        self.not_after
    }

    /// `firstSeen < t` alone, or `AND(base, firstSeen < t)` when a base predicate is given
    pub fn compose(&self, base: Option<&Query>) -> Query {
        let bound = Query::less_than(
            FIRST_SEEN_ATTRIBUTE,
            self.not_after.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        );
        match base {
            Some(base) => Query::and(base.clone(), bound),
            None => bound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn fixed_instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_compose_without_base() {
        let composer = EligibilityQueryComposer::at(fixed_instant());

        let query = composer.compose(None);

        assert_eq!(
            query.as_json(),
            &json!({ "lt": { "firstSeen": "2024-05-01T10:00:00Z" } })
        );
    }

    #[test]
    fn test_compose_with_base_wraps_in_and() {
        let composer = EligibilityQueryComposer::at(fixed_instant());
        let base = Query::from_json(json!({ "eq": { "customClientData.zone": "north" } }));

        let query = composer.compose(Some(&base));

        assert_eq!(
            query.as_json(),
            &json!({
                "and": [
                    { "eq": { "customClientData.zone": "north" } },
                    { "lt": { "firstSeen": "2024-05-01T10:00:00Z" } }
                ]
            })
        );
    }

    #[test]
    fn test_time_bound_identical_with_and_without_base() {
        let composer = EligibilityQueryComposer::starting_now();
        let base = Query::from_json(json!({ "regex": { "unitId": "^sensor-" } }));

        let bare = composer.compose(None);
        let wrapped = composer.compose(Some(&base));

        assert_eq!(wrapped.as_json()["and"][0], *base.as_json());
        assert_eq!(wrapped.as_json()["and"][1], *bare.as_json());
    }

    #[test]
    fn test_starting_now_has_millisecond_precision() {
        let composer = EligibilityQueryComposer::starting_now();
        assert_eq!(composer.not_after().timestamp_subsec_nanos() % 1_000_000, 0);
    }

    #[test]
    fn test_sub_second_precision_is_kept() {
        let instant = Utc.timestamp_millis_opt(1_714_557_600_123).unwrap();
        let query = EligibilityQueryComposer::at(instant).compose(None);
        assert_eq!(
            query.as_json()["lt"]["firstSeen"],
            json!("2024-05-01T10:00:00.123Z")
        );
    }
}
