//! Property-based tests for prompt binding and content hashing

use letterflow::binding::{bind_prompt, ReviewerContext, PLACEHOLDER_KEYS};
use letterflow::ledger::content_hash;
use letterflow::request::ApplicantData;
use letterflow::template::{Template, TemplateCategory, TemplateParameters};
use proptest::prelude::*;
use std::collections::BTreeSet;

fn template(skeleton: String) -> Template {
    Template {
        id: "prop".to_string(),
        category: TemplateCategory::General,
        prompt_skeleton: skeleton,
        default_parameters: TemplateParameters::default(),
    }
}

fn value() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z .,]{0,24}"
}

fn skeleton_from(keys: &[&str]) -> String {
    keys.iter()
        .map(|key| format!("{}: {{{{{}}}}}", key, key))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Binding the same inputs twice yields the same prompt
#[test]
fn test_bind_prompt_determinism_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(value(), value(), value(), value(), value()),
            |(name, program, relationship, duration, strengths)| {
                let applicant = ApplicantData::new(name.clone(), program.clone());
                let context = ReviewerContext::new(relationship, duration, strengths);
                let template = template(
                    "Recommend {{applicant_name}} for {{program}}. \
                     Known as {{relationship}} for {{duration}}. {{strengths}}"
                        .to_string(),
                );

                let first = bind_prompt(&template, &applicant, &context).unwrap();
                let second = bind_prompt(&template, &applicant, &context).unwrap();
                assert_eq!(first, second);
                assert!(first.contains(name.trim()));
                assert!(first.contains(program.trim()));
                assert!(!first.contains("{{"));

                Ok(())
            },
        )
        .unwrap();
}

proptest! {
    /// Every referenced but unbound key is reported, sorted and once
    #[test]
    fn test_binding_error_lists_exactly_the_missing_keys(
        referenced in proptest::sample::subsequence(PLACEHOLDER_KEYS.to_vec(), 1..=PLACEHOLDER_KEYS.len()),
        with_goal in any::<bool>(),
        with_examples in any::<bool>(),
    ) {
        let mut applicant = ApplicantData::new("Jane Doe", "MSc Computer Science");
        if with_goal {
            applicant = applicant.with_goal("Research in distributed systems");
        }
        let mut context = ReviewerContext::new("thesis advisor", "two years", "rigor");
        if with_examples {
            context = context.with_examples("Led the lab's replication study");
        }

        let template = template(skeleton_from(&referenced));
        let unbound: BTreeSet<&str> = ["goal", "achievements", "examples", "additional_notes"]
            .into_iter()
            .filter(|key| match *key {
                "goal" => !with_goal,
                "examples" => !with_examples,
                _ => true,
            })
            .collect();
        let expected: Vec<String> = referenced
            .iter()
            .filter(|key| unbound.contains(*key))
            .map(|key| key.to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        match bind_prompt(&template, &applicant, &context) {
            Ok(prompt) => {
                prop_assert!(expected.is_empty());
                prop_assert!(!prompt.contains("{{"));
            }
            Err(err) => {
                prop_assert_eq!(err.template_id.as_str(), "prop");
                prop_assert_eq!(err.missing, expected);
            }
        }
    }

    /// Whitespace-only values count as missing
    #[test]
    fn test_blank_values_are_never_bound(blank in "[ \t]{0,6}") {
        let applicant = ApplicantData::new("Jane Doe", "MSc").with_achievements(blank);
        let context = ReviewerContext::new("advisor", "a year", "focus");
        let err = bind_prompt(&template("{{achievements}}".to_string()), &applicant, &context)
            .unwrap_err();
        prop_assert_eq!(err.missing, vec!["achievements".to_string()]);
    }

    /// Content hashes depend only on the content
    #[test]
    fn test_content_hash_determinism(a in any::<String>(), b in any::<String>()) {
        prop_assert_eq!(content_hash(&a), content_hash(&a));
        prop_assert_eq!(content_hash(&a).len(), 64);
        if a != b {
            prop_assert_ne!(content_hash(&a), content_hash(&b));
        }
    }
}
