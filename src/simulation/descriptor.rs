use super::Metric;
use std::fmt::Write;
use strum::IntoEnumIterator;

/// BehaviorSpace experiment for a single headless run.
#[derive(Debug, Clone)]
pub struct ExperimentDescriptor<'a> {
    pub max_ticks: u64,
    pub seed: u64,
    pub bindings: Vec<(&'a str, f64)>,
}

impl<'a> ExperimentDescriptor<'a> {
    pub fn new(max_ticks: u64, seed: u64, bindings: Vec<(&'a str, f64)>) -> Self {
        Self {
            max_ticks,
            seed,
            bindings,
        }
    }

    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(512 + self.bindings.len() * 96);
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        xml.push_str("<!DOCTYPE experiments SYSTEM \"behaviorspace.dtd\">\n");
        xml.push_str("<experiments>\n");
        xml.push_str(
            "  <experiment name=\"optimization_run\" repetitions=\"1\" runMetricsEveryStep=\"false\">\n",
        );
        let _ = writeln!(xml, "    <setup>random-seed {}\nsetup</setup>", self.seed);
        xml.push_str("    <go>go</go>\n");
        let _ = writeln!(xml, "    <timeLimit steps=\"{}\"/>", self.max_ticks);
        for metric in Metric::iter() {
            let _ = writeln!(xml, "    <metric>{}</metric>", metric);
        }
        for (name, value) in &self.bindings {
            let _ = writeln!(
                xml,
                "    <enumeratedValueSet variable=\"{}\"><value value=\"{}\"/></enumeratedValueSet>",
                escape_attr(name),
                value
            );
        }
        xml.push_str("  </experiment>\n");
        xml.push_str("</experiments>\n");
        xml
    }
}

fn escape_attr(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
