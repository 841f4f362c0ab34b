// SPDX-License-Identifier: Apache-2.0
//
// Echidna/Medusa call-sequence to Foundry replay converter.
//
// The converter recognizes two line shapes in a fuzzer reproducer trace:
//
//   Contract.someCall(1,2) from: 0x... Time delay: 12 seconds Block delay: 3
//   *wait* Time delay: 12 seconds Block delay: 3
//
// and emits the matching vm.prank / vm.warp / vm.roll cheatcodes plus the
// call itself. Every call except the last recognized one is wrapped in
// `try this.X() {} catch {}` so a reverting intermediate call does not stop
// the replay; the final call is emitted bare since its outcome is the one
// under test. Lines matching neither shape (headers, annotations) are
// skipped without error.

use regex::Regex;

/// Configuration for the converter.
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    /// Name of the emitted test function
    pub function_name: String,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        ConvertConfig {
            function_name: "test_replay".to_string(),
        }
    }
}

/// One recognized line of the input trace.
#[derive(Debug, Clone, PartialEq)]
enum Action<'a> {
    /// A fuzzer-generated call, with optional sender and delay suffixes.
    Call {
        expr: &'a str,
        from: Option<&'a str>,
        time_delay: Option<&'a str>,
        block_delay: Option<&'a str>,
    },
    /// A pure time/block advance with no call.
    Wait {
        time_delay: Option<&'a str>,
        block_delay: Option<&'a str>,
    },
}

/// Result of converting a single trace.
#[derive(Debug, Clone)]
pub struct ConvertResult {
    pub output: String,
    pub calls_emitted: usize,
    pub waits_emitted: usize,
    /// Non-blank input lines that matched neither pattern, with 1-based
    /// line numbers. Skipping is silent; this exists for verbose reporting.
    pub skipped: Vec<(usize, String)>,
}

/// Main converter struct that processes call-sequence traces.
pub struct Converter {
    config: ConvertConfig,
    call_re: Regex,
    wait_re: Regex,
}

impl Converter {
    pub fn new(config: ConvertConfig) -> Self {
        // The argument capture stops at the first ')': the trace format as
        // emitted by the fuzzer only contains scalar and string literals, so
        // nested parentheses never appear in practice. An expression that did
        // contain them would be truncated at the inner ')'.
        let call_re = Regex::new(
            r"(?:\w+\.)?(\w+\([^)]*\))(?: from: (0x[0-9a-fA-F]{40}))?(?: Time delay: (\d+) seconds)?(?: Block delay: (\d+))?",
        )
        .unwrap();
        let wait_re =
            Regex::new(r"\*wait\*(?: Time delay: (\d+) seconds)?(?: Block delay: (\d+))?").unwrap();

        Converter {
            config,
            call_re,
            wait_re,
        }
    }

    /// Convert a whole call-sequence trace into one Foundry test function.
    ///
    /// This is a pure transformation: it never fails, and unrecognized lines
    /// contribute nothing to the output.
    pub fn convert(&self, call_sequence: &str) -> ConvertResult {
        let mut actions: Vec<Action> = Vec::new();
        let mut skipped: Vec<(usize, String)> = Vec::new();

        for (idx, line) in call_sequence.trim().lines().enumerate() {
            match self.classify(line) {
                Some(action) => actions.push(action),
                None => {
                    if !line.trim().is_empty() {
                        skipped.push((idx + 1, line.to_string()));
                    }
                }
            }
        }

        // Only recognized call lines count towards "last": a trailing wait or
        // stray log line must not demote the final call to the guarded form.
        let last_call = actions
            .iter()
            .rposition(|a| matches!(a, Action::Call { .. }));

        let mut output = format!("function {}() public {{\n", self.config.function_name);
        let mut calls_emitted = 0;
        let mut waits_emitted = 0;

        for (i, action) in actions.iter().enumerate() {
            match action {
                Action::Call {
                    expr,
                    from,
                    time_delay,
                    block_delay,
                } => {
                    if let Some(addr) = from {
                        output.push_str(&format!("    vm.prank({});\n", addr));
                    }
                    if let Some(secs) = time_delay {
                        output.push_str(&format!("    vm.warp(block.timestamp + {});\n", secs));
                    }
                    if let Some(blocks) = block_delay {
                        output.push_str(&format!("    vm.roll(block.number + {});\n", blocks));
                    }
                    if Some(i) == last_call {
                        output.push_str(&format!("    {};\n", expr));
                    } else {
                        output.push_str(&format!("    try this.{} {{}} catch {{}}\n", expr));
                    }
                    output.push('\n');
                    calls_emitted += 1;
                }
                Action::Wait {
                    time_delay,
                    block_delay,
                } => {
                    if let Some(secs) = time_delay {
                        output.push_str(&format!("    vm.warp(block.timestamp + {});\n", secs));
                    }
                    if let Some(blocks) = block_delay {
                        output.push_str(&format!("    vm.roll(block.number + {});\n", blocks));
                    }
                    output.push('\n');
                    waits_emitted += 1;
                }
            }
        }

        output.push_str("}\n");

        ConvertResult {
            output,
            calls_emitted,
            waits_emitted,
            skipped,
        }
    }

    /// Classify one input line. Call matching is attempted before wait
    /// matching; a line matching neither returns None.
    fn classify<'a>(&self, line: &'a str) -> Option<Action<'a>> {
        if let Some(cap) = self.call_re.captures(line) {
            return Some(Action::Call {
                expr: cap.get(1).unwrap().as_str(),
                from: cap.get(2).map(|m| m.as_str()),
                time_delay: cap.get(3).map(|m| m.as_str()),
                block_delay: cap.get(4).map(|m| m.as_str()),
            });
        }
        if let Some(cap) = self.wait_re.captures(line) {
            return Some(Action::Wait {
                time_delay: cap.get(1).map(|m| m.as_str()),
                block_delay: cap.get(2).map(|m| m.as_str()),
            });
        }
        None
    }
}
