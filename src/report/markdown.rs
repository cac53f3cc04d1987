//! Markdown rendering of a corpus summary

use crate::types::{CapabilityTable, FunctionStat, Summary};

/// Function classes listed in the cross-class section
pub const COMMON_FUNCTION_LIMIT: usize = 25;

/// Render the data reference document. Output depends only on the summary
/// and the capability table.
pub fn render_markdown(summary: &Summary, capabilities: &CapabilityTable) -> String {
    let mut lines: Vec<String> = Vec::new();

    render_header(&mut lines);
    render_inventory(&mut lines, summary);
    render_common_functions(&mut lines, summary, capabilities);
    render_class_details(&mut lines, summary, capabilities);
    render_payload_shape(&mut lines);
    render_data_gaps(&mut lines);
    render_diagnostics(&mut lines, summary);

    lines.join("\n")
}

fn render_header(lines: &mut Vec<String>) {
    lines.push("# HubSpace Metadevices Data Reference".into());
    lines.push(String::new());
    lines.push(
        "This document summarizes your collected HubSpace/Afero metadevices payload, mapping \
         device classes to their observed function classes, value types, and example values. \
         It also suggests Hubitat capability mappings and PUT payload shapes."
            .into(),
    );
    lines.push(String::new());
}

fn render_inventory(lines: &mut Vec<String>, summary: &Summary) {
    lines.push("## Inventory".into());
    lines.push(format!("- Devices analyzed: {}", summary.device_count));
    lines.push("- Classes observed:".into());
    for (class, count) in summary.classes_by_count() {
        lines.push(format!("  - {}: {}", class, count));
    }
    lines.push(String::new());
}

fn render_common_functions(
    lines: &mut Vec<String>,
    summary: &Summary,
    capabilities: &CapabilityTable,
) {
    lines.push("## Common Function Classes (across device classes)".into());
    for (function_class, occurrences) in summary.common_function_classes(COMMON_FUNCTION_LIMIT) {
        let hint = capabilities
            .get(function_class)
            .map(|h| format!(" → Hubitat: {}", h.capability))
            .unwrap_or_default();
        lines.push(format!(
            "- `{}` in {} class(es){}",
            function_class, occurrences, hint
        ));
    }
    lines.push(String::new());
}

fn render_class_details(
    lines: &mut Vec<String>,
    summary: &Summary,
    capabilities: &CapabilityTable,
) {
    lines.push("## Per-Class Details".into());
    for class in summary.device_classes() {
        lines.push(format!("### {}", class));
        let functions = summary.function_classes_of(class);
        if functions.is_empty() {
            lines.push("(no function classes observed)".into());
            lines.push(String::new());
            continue;
        }
        for (function_class, stat) in functions {
            render_function(lines, function_class, stat, capabilities);
        }
    }
}

fn render_function(
    lines: &mut Vec<String>,
    function_class: &str,
    stat: &FunctionStat,
    capabilities: &CapabilityTable,
) {
    lines.push(format!(
        "- `{}`: on {} device(s), {} state entr(y/ies)",
        function_class, stat.device_count, stat.state_count
    ));

    let value_types = stat
        .value_types_by_frequency()
        .iter()
        .map(|(t, count)| format!("{}:{}", t, count))
        .collect::<Vec<_>>()
        .join(", ");
    lines.push(format!("  - Value types: {}", value_types));

    if !stat.instances.is_empty() {
        let instances = stat
            .instances
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!("  - Instances: {}", instances));
    }

    if let Some(sample) = stat.first_sample() {
        lines.push(format!("  - Sample: {}", sample));
    }

    if let Some(hint) = capabilities.get(function_class) {
        lines.push(format!(
            "  - Hubitat: {} ({})",
            hint.capability,
            hint.attributes.join(", ")
        ));
    }
    lines.push(String::new());
}

fn render_payload_shape(lines: &mut Vec<String>) {
    lines.push("## PUT Payload Shape".into());
    lines.push(
        "All updates flow through PUT `/v1/accounts/{accountId}/metadevices/{deviceId}/state` \
         with body:"
            .into(),
    );
    lines.push("```".into());
    lines.push(
        r#"{ "metadeviceId": "<deviceId>", "values": [ { "functionClass": "<class>", "functionInstance": null, "value": <scalar-or-object> } ] }"#
            .into(),
    );
    lines.push("```".into());
    lines.push("Notes:".into());
    lines.push("- Timestamps are optional; HubSpace accepts server-side TS.".into());
    lines.push(
        "- For boolean-like toggles, some devices use strings `on|off` rather than true/false."
            .into(),
    );
    lines.push(
        "- Color RGB expects an object `{r,g,b}`; thermostat targets use distinct functionInstances."
            .into(),
    );
    lines.push(String::new());
}

fn render_data_gaps(lines: &mut Vec<String>) {
    lines.push("## Next Data Gaps to Explore".into());
    lines.push(
        "- If some classes above show only `unknown` or few function classes, collect additional \
         samples with the latest script."
            .into(),
    );
    lines.push(
        "- For devices with object-valued states (e.g., `color-rgb`), capture a couple of values \
         to confirm full shape."
            .into(),
    );
    lines.push(
        "- Consider fetching versions for all deviceIds to correlate firmware with capabilities."
            .into(),
    );
}

fn render_diagnostics(lines: &mut Vec<String>, summary: &Summary) {
    let diagnostics = summary.diagnostics;
    lines.push(String::new());
    lines.push("### Diagnostics".into());
    lines.push(format!(
        "- Malformed state containers: {}",
        diagnostics.malformed_state_containers
    ));
    lines.push(format!(
        "- Malformed state entries: {}",
        diagnostics.malformed_state_entries
    ));
}
