//! Reassembly of the multi-line JSON objects the server writes between
//! `JSON_BEGIN` and `JSON_END` marker lines.

use serde_json::Value;

pub const JSON_BEGIN_MARKER: &str = "JSON_BEGIN";
pub const JSON_END_MARKER: &str = "JSON_END";
const MAX_BUFFERED_FRAGMENTS: usize = 500;
const PROBE_EVERY_PARSE_ERRORS: u32 = 3;

#[derive(Debug, Clone, PartialEq)]
pub enum AssemblerStep {
    /// The line is not part of a JSON block and should be routed normally.
    NotConsumed,
    Consumed,
    Payload(Value),
    /// The block closed but did not parse. `probe` asks the caller to check
    /// that the remote-control channel is still alive.
    ParseFailed { probe: bool },
}

#[derive(Debug, Default)]
enum Phase {
    #[default]
    Idle,
    Collecting(Vec<String>),
}

#[derive(Debug, Default)]
pub struct JsonAssembler {
    phase: Phase,
    parse_error_count: u32,
    recovery_count: u32,
}

impl JsonAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_collecting(&self) -> bool {
        matches!(self.phase, Phase::Collecting(_))
    }

    pub fn parse_error_count(&self) -> u32 {
        self.parse_error_count
    }

    pub fn recovery_count(&self) -> u32 {
        self.recovery_count
    }

    pub fn feed(&mut self, line: &str) -> AssemblerStep {
        if line.contains(JSON_BEGIN_MARKER) {
            if self.is_collecting() {
                self.recover("nested JSON_BEGIN");
            }
            self.phase = Phase::Collecting(vec!["{".to_string()]);
            return AssemblerStep::Consumed;
        }

        if line.contains(JSON_END_MARKER) {
            return self.finish(line);
        }

        let Phase::Collecting(fragments) = &mut self.phase else {
            return AssemblerStep::NotConsumed;
        };

        if fragments.len() > MAX_BUFFERED_FRAGMENTS {
            self.recover("JSON buffer overflow");
            return AssemblerStep::Consumed;
        }

        let content = extract_json_content(line);
        if content.is_empty() {
            return AssemblerStep::Consumed;
        }

        if let Some(previous) = fragments.last_mut() {
            let previous_is_brace = matches!(previous.as_str(), "{" | "}");
            let previous_trimmed = previous.trim_end();
            if !previous_is_brace && !previous_trimmed.ends_with(',') && !previous_trimmed.ends_with('{')
            {
                previous.push(',');
            }
        }
        fragments.push(content.to_string());
        AssemblerStep::Consumed
    }

    fn finish(&mut self, line: &str) -> AssemblerStep {
        let Phase::Collecting(mut fragments) = std::mem::take(&mut self.phase) else {
            self.recover("JSON_END without JSON_BEGIN");
            return AssemblerStep::Consumed;
        };

        let closing_braces = line.matches('}').count();
        fragments.extend(std::iter::repeat("}".to_string()).take(closing_braces));
        let assembled = fragments.join("\n");
        tracing::trace!(buffer = %assembled, "Assembled JSON block");

        match serde_json::from_str::<Value>(&assembled) {
            Ok(payload) => {
                self.parse_error_count = 0;
                AssemblerStep::Payload(payload)
            }
            Err(error) => {
                self.parse_error_count += 1;
                let probe = self.parse_error_count % PROBE_EVERY_PARSE_ERRORS == 0;
                tracing::error!(
                    parse_errors = self.parse_error_count,
                    error = %error,
                    "Failed to parse JSON block"
                );
                if probe {
                    tracing::warn!(
                        parse_errors = self.parse_error_count,
                        "Repeated JSON parse errors, probing remote control"
                    );
                }
                AssemblerStep::ParseFailed { probe }
            }
        }
    }

    fn recover(&mut self, reason: &str) {
        self.parse_error_count += 1;
        self.recovery_count += 1;
        self.phase = Phase::Idle;
        tracing::warn!(
            reason,
            recoveries = self.recovery_count,
            parse_errors = self.parse_error_count,
            "JSON assembler reset"
        );
    }
}

/// Payload part of a block line: everything after the log prefix, kept only
/// when it starts like a JSON member or brace.
pub fn extract_json_content(line: &str) -> &str {
    let Some((_, content)) = line.split_once(": ") else {
        return "";
    };
    let content = content.trim();
    if content.starts_with(['"', '{', '}']) {
        content
    } else {
        ""
    }
}

#[cfg(test)]
mod tests {
    use super::{extract_json_content, AssemblerStep, JsonAssembler};
    use serde_json::json;

    const PREFIX: &str = "L 01/03/2026 - 18:25:00: ";

    fn feed_all(assembler: &mut JsonAssembler, lines: &[&str]) -> Vec<AssemblerStep> {
        lines
            .iter()
            .map(|line| assembler.feed(&format!("{PREFIX}{line}")))
            .collect()
    }

    #[test]
    fn end_without_begin_counts_one_recovery() {
        let mut assembler = JsonAssembler::new();

        assert_eq!(
            assembler.feed("L 01/03/2026 - 18:25:00: }JSON_END"),
            AssemblerStep::Consumed
        );
        assert_eq!(assembler.parse_error_count(), 1);
        assert_eq!(assembler.recovery_count(), 1);
        assert!(!assembler.is_collecting());
    }

    #[test]
    fn nested_begin_restarts_the_block() {
        let mut assembler = JsonAssembler::new();
        feed_all(&mut assembler, &["JSON_BEGIN{", "\"stale\": \"x\""]);
        feed_all(&mut assembler, &["JSON_BEGIN{", "\"name\": \"fresh\""]);

        assert_eq!(assembler.recovery_count(), 1);
        assert!(assembler.is_collecting());

        let steps = feed_all(&mut assembler, &["}JSON_END"]);
        assert_eq!(steps, vec![AssemblerStep::Payload(json!({"name": "fresh"}))]);
        assert_eq!(assembler.parse_error_count(), 0);
    }

    #[test]
    fn assembles_round_stats_block() {
        let mut assembler = JsonAssembler::new();
        let mut steps = feed_all(
            &mut assembler,
            &[
                "JSON_BEGIN{",
                "\"name\": \"round_stats\",",
                "\"round_number\" : \"5\"",
                "\"score_t\" : \"1\"",
                "\"score_ct\" : \"3\"",
                "\"fields\" : \"accountid, kills, 3k\"",
                "\"players\" : {",
                "\"player_0\" : \"1001, 3, 1\"",
                "\"player_1\" : \"1002, 0, 0\"",
                "}}JSON_END",
            ],
        );

        let Some(AssemblerStep::Payload(payload)) = steps.pop() else {
            panic!("Expected a parsed payload");
        };
        assert!(steps.iter().all(|step| *step == AssemblerStep::Consumed));
        assert_eq!(payload["name"], "round_stats");
        assert_eq!(payload["round_number"], "5");
        assert_eq!(payload["players"]["player_1"], "1002, 0, 0");
        assert!(!assembler.is_collecting());
    }

    #[test]
    fn lines_outside_a_block_are_not_consumed() {
        let mut assembler = JsonAssembler::new();
        assert_eq!(
            assembler.feed("L 01/03/2026 - 18:25:00: \"alice<2><[U:1:1]><CT>\" say \"hi\""),
            AssemblerStep::NotConsumed
        );
    }

    #[test]
    fn oversized_block_is_abandoned() {
        let mut assembler = JsonAssembler::new();
        assembler.feed("L 01/03/2026 - 18:25:00: JSON_BEGIN{");
        for index in 0..501 {
            assembler.feed(&format!("{PREFIX}\"key_{index}\": {index}"));
        }

        assert!(!assembler.is_collecting());
        assert_eq!(assembler.recovery_count(), 1);
        assert_eq!(assembler.parse_error_count(), 1);
    }

    #[test]
    fn every_third_consecutive_parse_failure_requests_a_probe() {
        let mut assembler = JsonAssembler::new();
        let broken_block = ["JSON_BEGIN{", "\"a\" 1", "}JSON_END"];

        let probes = (0..3)
            .filter_map(|_| feed_all(&mut assembler, &broken_block).pop())
            .collect::<Vec<AssemblerStep>>();
        assert_eq!(
            probes,
            vec![
                AssemblerStep::ParseFailed { probe: false },
                AssemblerStep::ParseFailed { probe: false },
                AssemblerStep::ParseFailed { probe: true },
            ]
        );

        feed_all(&mut assembler, &["JSON_BEGIN{", "\"a\": 1", "}JSON_END"]);
        assert_eq!(assembler.parse_error_count(), 0);
    }

    #[test]
    fn extracts_only_json_looking_content() {
        assert_eq!(
            extract_json_content("L 01/03/2026 - 18:25:00: \"kills\" : \"3\","),
            "\"kills\" : \"3\","
        );
        assert_eq!(extract_json_content("L 01/03/2026 - 18:25:00: Round_End"), "");
        assert_eq!(extract_json_content("no delimiter"), "");
    }
}
