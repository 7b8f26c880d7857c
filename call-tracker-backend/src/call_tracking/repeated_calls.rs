use api_structs::tracking::{ChildCall, TraceRecord};
use api_structs::ui::repeated_calls::{AggregatedCallStat, RepeatedCallsParent, RepeatedCallsReport};
use indexmap::IndexMap;

const OUTPUT_DECIMALS_FACTOR: f64 = 1000.0;

/// Aggregates are kept at full precision, only output values go through here.
pub fn round_for_output(value: f64) -> f64 {
    (value * OUTPUT_DECIMALS_FACTOR).round() / OUTPUT_DECIMALS_FACTOR
}

#[derive(Debug, Clone, Default)]
struct CallGroup {
    durations_ms: Vec<f64>,
    db_statement: Option<String>,
}

impl CallGroup {
    fn total_ms(&self) -> f64 {
        self.durations_ms.iter().sum()
    }

    fn to_stat(&self) -> AggregatedCallStat {
        let total = self.total_ms();
        let min = self.durations_ms.iter().copied().fold(f64::INFINITY, f64::min);
        let max = self
            .durations_ms
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        AggregatedCallStat {
            call_count: self.durations_ms.len(),
            total_time_ms: round_for_output(total),
            average_time_ms: round_for_output(total / self.durations_ms.len() as f64),
            min_time_ms: round_for_output(min),
            max_time_ms: round_for_output(max),
            db_statement: self.db_statement.clone().filter(|s| !s.is_empty()),
        }
    }
}

/// Single pass, groups keep the order in which their key was first seen.
/// Only non HTTP groups keep a statement, the last one seen wins.
fn group_calls(calls: &[ChildCall]) -> IndexMap<String, CallGroup> {
    let mut groups: IndexMap<String, CallGroup> = IndexMap::new();
    for call in calls {
        let group = groups.entry(call.group_key()).or_default();
        if call.url.is_none() {
            if let Some(statement) = &call.db_statement {
                group.db_statement = Some(statement.clone());
            }
        }
        group.durations_ms.push(call.duration_ms);
    }
    groups
}

/// Stats per group key, by total time descending. Groups with equal totals keep
/// their first seen order. Also returns the full precision total of all calls.
pub fn aggregate_calls(calls: &[ChildCall]) -> (IndexMap<String, AggregatedCallStat>, f64) {
    let groups = group_calls(calls);
    let total_ms = groups.values().map(CallGroup::total_ms).sum();
    let mut stats: IndexMap<String, AggregatedCallStat> = groups
        .into_iter()
        .map(|(key, group)| {
            let stat = group.to_stat();
            (key, stat)
        })
        .collect();
    // stable
    stats.sort_by(|_, a, _, b| b.total_time_ms.total_cmp(&a.total_time_ms));
    (stats, total_ms)
}

/// `None` when the record made no calls, there is nothing to report then.
pub fn repeated_calls_report(record: &TraceRecord) -> Option<RepeatedCallsReport> {
    if record.called_methods.is_empty() {
        return None;
    }
    let (calls, total_ms) = aggregate_calls(&record.called_methods);
    Some(RepeatedCallsReport {
        parent: RepeatedCallsParent {
            name: record.root_call_name.clone(),
            details: record.details.clone(),
            total_time_ms: round_for_output(total_ms),
        },
        calls,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    fn db(name: &str, duration_ms: f64, statement: &str) -> ChildCall {
        ChildCall {
            name: name.to_string(),
            duration_ms,
            url: None,
            db_statement: Some(statement.to_string()),
        }
    }

    fn http(name: &str, url: &str, duration_ms: f64) -> ChildCall {
        ChildCall {
            name: name.to_string(),
            duration_ms,
            url: Some(url.to_string()),
            db_statement: None,
        }
    }

    #[test]
    fn database_calls_with_the_same_name_are_merged() {
        let (stats, total) = aggregate_calls(&[db("db", 5.0, "SELECT 1"), db("db", 15.0, "SELECT 1")]);
        assert_eq!(stats.len(), 1);
        assert_eq!(
            stats["db"],
            AggregatedCallStat {
                call_count: 2,
                total_time_ms: 20.0,
                average_time_ms: 10.0,
                min_time_ms: 5.0,
                max_time_ms: 15.0,
                db_statement: Some("SELECT 1".to_string()),
            }
        );
        assert_eq!(total, 20.0);
    }

    #[test]
    fn http_calls_are_split_by_url() {
        let (stats, _) = aggregate_calls(&[http("svc", "/a", 10.0), http("svc", "/b", 20.0)]);
        let keys: Vec<&str> = stats.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["svc /b", "svc /a"]);
        assert_eq!(stats["svc /a"].call_count, 1);
        assert_eq!(stats["svc /b"].db_statement, None);
    }

    #[test]
    fn groups_sorted_by_total_keeping_first_seen_order_on_ties() {
        let calls = [
            db("first", 1.0, "a"),
            http("svc", "/x", 10.0),
            db("second", 1.0, "b"),
            db("big", 30.0, "c"),
            db("third", 0.5, "d"),
            db("third", 0.5, "d"),
        ];
        let (stats, total) = aggregate_calls(&calls);
        let keys: Vec<&str> = stats.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["big", "svc /x", "first", "second", "third"]);
        let totals: Vec<f64> = stats.values().map(|s| s.total_time_ms).collect();
        assert!(totals.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(total, 43.0);
    }

    #[test]
    fn last_statement_wins_and_empty_ones_are_dropped() {
        let mut without_statement = db("db", 1.0, "");
        without_statement.db_statement = None;
        let (stats, _) = aggregate_calls(&[db("db", 1.0, "SELECT 1"), db("db", 1.0, "SELECT 2"), without_statement]);
        assert_eq!(stats["db"].db_statement.as_deref(), Some("SELECT 2"));
        let (stats, _) = aggregate_calls(&[db("empty", 1.0, "")]);
        assert_eq!(stats["empty"].db_statement, None);
    }

    #[test]
    fn http_calls_ignore_statements() {
        let mut both = http("svc", "/a", 2.0);
        both.db_statement = Some("SELECT 1".to_string());
        let (stats, _) = aggregate_calls(&[both]);
        assert_eq!(stats["svc /a"].db_statement, None);
    }

    #[test]
    fn output_values_are_rounded_to_three_decimals() {
        let (stats, total) = aggregate_calls(&[db("db", 0.1, "q"), db("db", 0.2, "q"), db("db", 0.30049, "q")]);
        let stat = &stats["db"];
        assert_eq!(stat.total_time_ms, 0.6);
        assert_eq!(stat.average_time_ms, 0.2);
        assert_eq!(stat.max_time_ms, 0.3);
        assert!((total - 0.60049).abs() < 1e-12);
        assert_eq!(round_for_output(1.23456), 1.235);
    }

    #[test]
    fn records_without_calls_have_no_report() {
        let record = crate::call_tracking::test::record("GET /empty", "t", vec![]);
        assert!(repeated_calls_report(&record).is_none());
    }
}
