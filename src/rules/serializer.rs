//! Rule Serializer
//!
//! Emits one Snakemake rule block per [`RuleSpec`] with a fixed section
//! order: description comment, header, input, params, output, resources,
//! shell, run. Empty sections are left out entirely.

use super::model::{Entry, RuleSpec};

const SECTION_INDENT: &str = "\t";
const ENTRY_INDENT: &str = "\t\t";
const SHELL_INDENT: &str = "\t\t\t";

/// Renders a single rule block, terminated by a newline.
pub fn render_rule(rule: &RuleSpec) -> String {
    let mut out = String::new();

    match rule.description.as_deref() {
        Some(description) => out.push_str(&format!("# Description: {}", description)),
        None => out.push_str("# Description missing"),
    }
    out.push_str(&format!("\nrule {}:", rule.name));

    push_section(&mut out, "input", &rule.inputs);
    push_section(&mut out, "params", &rule.params);
    push_section(&mut out, "output", &rule.outputs);
    push_section(&mut out, "resources", &rule.resources);
    push_shell(&mut out, &rule.shell);
    push_run(&mut out, &rule.run);

    out.push('\n');
    out
}

/// Renders all rules back to back.
pub fn render_rules(rules: &[RuleSpec]) -> String {
    rules.iter().map(render_rule).collect()
}

fn push_section(out: &mut String, name: &str, entries: &[Entry]) {
    let entries: Vec<&Entry> = entries.iter().filter(|e| !e.value.is_empty()).collect();
    if entries.is_empty() {
        return;
    }

    out.push_str(&format!("\n{}{}:", SECTION_INDENT, name));
    for entry in entries {
        out.push_str(&format!("\n{}{}={},", ENTRY_INDENT, entry.key, entry.value.render()));
    }
}

fn push_shell(out: &mut String, lines: &[String]) {
    let lines: Vec<&String> = lines.iter().filter(|l| !l.trim().is_empty()).collect();
    if lines.is_empty() {
        return;
    }

    out.push_str(&format!("\n{}shell:\n{}\"\"\"", SECTION_INDENT, ENTRY_INDENT));
    for line in lines {
        out.push_str(&format!("\n{}{}", SHELL_INDENT, line));
    }
    out.push_str(&format!("\n{}\"\"\"", ENTRY_INDENT));
}

fn push_run(out: &mut String, entries: &[Entry]) {
    let entries: Vec<&Entry> = entries.iter().filter(|e| !e.value.is_empty()).collect();
    if entries.is_empty() {
        return;
    }

    out.push_str(&format!("\n{}run:", SECTION_INDENT));
    for entry in entries {
        if entry.key.is_empty() {
            out.push_str(&format!("\n{}{}", ENTRY_INDENT, entry.value.render()));
        } else {
            out.push_str(&format!("\n{}{}={}", ENTRY_INDENT, entry.key, entry.value.render()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::model::EntryValue;

    fn sample_rule() -> RuleSpec {
        let mut rule = RuleSpec::new("align");
        rule.description = Some("Align reads".to_string());
        rule.inputs.push(Entry::new(
            "reads",
            EntryValue::Quoted("/in/raw/{sample}/r.fq".to_string()),
        ));
        rule.params.push(Entry::new("threads", EntryValue::Raw("4".to_string())));
        rule.outputs.push(Entry::new(
            "bam",
            EntryValue::Quoted("/out/aligned/{sample}/r.bam".to_string()),
        ));
        rule.shell.push("aligner -t {params.threads} {input.reads} > {output.bam}".to_string());
        rule
    }

    #[test]
    fn test_render_rule_layout() {
        let expected = "# Description: Align reads\n\
rule align:\n\
\tinput:\n\
\t\treads=\"/in/raw/{sample}/r.fq\",\n\
\tparams:\n\
\t\tthreads=4,\n\
\toutput:\n\
\t\tbam=\"/out/aligned/{sample}/r.bam\",\n\
\tshell:\n\
\t\t\"\"\"\n\
\t\t\taligner -t {params.threads} {input.reads} > {output.bam}\n\
\t\t\"\"\"\n";

        assert_eq!(render_rule(&sample_rule()), expected);
    }

    #[test]
    fn test_render_is_deterministic() {
        let rule = sample_rule();
        assert_eq!(render_rule(&rule), render_rule(&rule));
    }

    #[test]
    fn test_empty_sections_are_omitted() {
        let mut rule = RuleSpec::new("bare");
        rule.outputs.push(Entry::new("x", EntryValue::Quoted("x.txt".to_string())));
        rule.params.push(Entry::new("skipped", EntryValue::Empty));
        rule.shell.push("   ".to_string());

        let text = render_rule(&rule);
        assert_eq!(text, "# Description missing\nrule bare:\n\toutput:\n\t\tx=\"x.txt\",\n");
        assert!(!text.contains("shell:"));
        assert!(!text.contains("run:"));
        assert!(!text.contains("resources:"));
        assert!(!text.contains("params:"));
    }

    #[test]
    fn test_run_section() {
        let mut rule = RuleSpec::new("index");
        rule.run.push(Entry::new(
            "idx",
            EntryValue::Raw("create_index(input.bvec)".to_string()),
        ));
        rule.run.push(Entry::new("", EntryValue::Raw("cleanup()".to_string())));

        let text = render_rule(&rule);
        assert!(text.ends_with("\trun:\n\t\tidx=create_index(input.bvec)\n\t\tcleanup()\n"));
    }

    #[test]
    fn test_render_rules_concatenated() {
        let a = RuleSpec::new("a");
        let b = RuleSpec::new("b");
        assert_eq!(
            render_rules(&[a, b]),
            "# Description missing\nrule a:\n# Description missing\nrule b:\n"
        );
    }
}
