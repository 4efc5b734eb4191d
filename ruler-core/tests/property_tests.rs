//! Property-based tests using proptest

use std::collections::BTreeSet;

use proptest::prelude::*;
use ruler_core::{Attr, Doc, EntityPattern, EntityRuler, RulerConfig, Span, TieBreak};

const WORDS: [&str; 6] = ["foo", "bar", "baz", "apple", "new", "york"];

fn word() -> impl Strategy<Value = &'static str> {
    prop::sample::select(WORDS.to_vec())
}

fn pattern() -> impl Strategy<Value = EntityPattern> {
    (
        prop::sample::select(vec!["ORG", "GPE", "PER"]),
        prop::collection::vec(word(), 1..4),
        prop::option::of(prop::sample::select(vec!["a1", "a2", "b7"])),
        any::<bool>(),
    )
        .prop_map(|(label, words, id, as_tokens)| {
            let pattern = if as_tokens {
                let specs: Vec<serde_json::Value> =
                    words.iter().map(|w| serde_json::json!({"LOWER": w})).collect();
                EntityPattern::tokens(label, serde_json::Value::Array(specs)).unwrap()
            } else {
                EntityPattern::phrase(label, words.join(" "))
            };
            match id {
                Some(id) => pattern.with_id(id),
                None => pattern,
            }
        })
}

fn text() -> impl Strategy<Value = String> {
    prop::collection::vec(word(), 0..12).prop_map(|words| words.join(" "))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_add_is_idempotent(patterns in prop::collection::vec(pattern(), 0..10)) {
        let mut ruler = EntityRuler::new(RulerConfig::default()).unwrap();
        ruler.add_patterns(patterns.clone()).unwrap();
        let count = ruler.len();
        let labels = ruler.labels();

        ruler.add_patterns(patterns.clone()).unwrap();
        ruler.add_patterns(vec![]).unwrap();
        prop_assert_eq!(ruler.len(), count);
        prop_assert_eq!(ruler.labels(), labels);

        let distinct: BTreeSet<String> =
            patterns.iter().map(|p| serde_json::to_string(p).unwrap()).collect();
        prop_assert_eq!(count, distinct.len());
    }

    #[test]
    fn test_labels_and_ids_are_distinct_sets(patterns in prop::collection::vec(pattern(), 0..10)) {
        let ruler = EntityRuler::with_patterns(RulerConfig::default(), patterns.clone()).unwrap();
        let expected_labels: BTreeSet<String> = patterns.iter().map(|p| p.label.clone()).collect();
        let expected_ids: BTreeSet<String> = patterns.iter().filter_map(|p| p.id.clone()).collect();

        let labels = ruler.labels();
        let ids = ruler.ent_ids();
        prop_assert_eq!(labels.len(), expected_labels.len());
        prop_assert_eq!(ids.len(), expected_ids.len());
        prop_assert_eq!(labels.into_iter().collect::<BTreeSet<_>>(), expected_labels);
        prop_assert_eq!(ids.into_iter().collect::<BTreeSet<_>>(), expected_ids);
    }

    #[test]
    fn test_bytes_roundtrip_keeps_state(
        patterns in prop::collection::vec(pattern(), 0..10),
        lower in any::<bool>(),
        tie_break in prop::sample::select(vec![TieBreak::EarliestStart, TieBreak::FirstRegistered]),
        text in text(),
    ) {
        let mut config = RulerConfig::default().with_tie_break(tie_break);
        if lower {
            config = config.with_phrase_matcher_attr(Attr::Lower);
        }
        let ruler = EntityRuler::with_patterns(config, patterns).unwrap();
        let mut restored = EntityRuler::new(RulerConfig::default()).unwrap();
        restored.from_bytes(&ruler.to_bytes().unwrap()).unwrap();

        prop_assert_eq!(restored.len(), ruler.len());
        prop_assert_eq!(restored.labels(), ruler.labels());
        prop_assert_eq!(restored.patterns(), ruler.patterns());
        prop_assert_eq!(restored.phrase_matcher_attr(), ruler.phrase_matcher_attr());
        prop_assert_eq!(restored.config().tie_break, tie_break);

        let before = ruler.process(Doc::new(text.clone())).unwrap();
        let after = restored.process(Doc::new(text)).unwrap();
        prop_assert_eq!(before.ents(), after.ents());
    }

    #[test]
    fn test_entities_never_overlap(
        patterns in prop::collection::vec(pattern(), 1..10),
        text in text(),
        overwrite in any::<bool>(),
    ) {
        let ruler = EntityRuler::with_patterns(
            RulerConfig::default().with_overwrite_ents(overwrite),
            patterns,
        )
        .unwrap();
        let doc = ruler.process(Doc::new(text)).unwrap();
        let labels = ruler.labels();

        for pair in doc.ents().windows(2) {
            prop_assert!(pair[0].end <= pair[1].start);
        }
        for ent in doc.ents() {
            prop_assert!(!ent.is_empty() && ent.end <= doc.len());
            prop_assert!(labels.contains(&ent.label));
        }
    }

    #[test]
    fn test_existing_entities_kept_without_overwrite(
        patterns in prop::collection::vec(pattern(), 1..10),
        words in prop::collection::vec(word(), 2..12),
    ) {
        let ruler = EntityRuler::with_patterns(RulerConfig::default(), patterns).unwrap();
        let mut doc = Doc::from_words(&words);
        let preset = Span::new(0, 2, "PRESET");
        doc.set_ents(vec![preset.clone()]).unwrap();

        ruler.apply(&mut doc).unwrap();
        prop_assert!(doc.ents().contains(&preset));
    }
}
