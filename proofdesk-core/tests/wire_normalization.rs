use pretty_assertions::assert_eq;
use proofdesk_core::wire::{detect_shape, normalize_issue, parse_item};
use proofdesk_core::position::{self, Resolution};
use proofdesk_core::{DecisionType, PlainText, WireShape};
use serde_json::json;

#[test]
fn frontend_shape_is_normalised() {
    let issue = normalize_issue(&json!({
        "id": "f-1",
        "original_text": "teh",
        "suggested_text": "the",
        "explanation": "Common misspelling",
        "rule_category": "spelling",
        "position": { "start": 15, "end": 18 }
    }))
    .unwrap();

    assert_eq!(issue.shape, WireShape::Frontend);
    assert_eq!(issue.original_text(), Some("teh"));
    assert_eq!(issue.suggestion(), Some("the"));
    assert_eq!(issue.explanation.as_deref(), Some("Common misspelling"));
    assert_eq!(issue.category, "spelling");
    assert_eq!(issue.span.offsets(), Some((15, 18)));
}

#[test]
fn api_shape_is_normalised() {
    let issue = normalize_issue(&json!({
        "id": 42,
        "evidence": "it&#39;s",
        "suggestion": "its",
        "message": "Possessive, not contraction",
        "category": "grammar",
        "severity": "major",
        "confidence": 0.93,
        "location": { "start": 3, "end": 7 }
    }))
    .unwrap();

    assert_eq!(issue.shape, WireShape::Api);
    assert_eq!(issue.id, "42");
    assert_eq!(issue.original_text(), Some("it's"));
    assert_eq!(issue.suggestion(), Some("its"));
    assert_eq!(issue.explanation.as_deref(), Some("Possessive, not contraction"));
    assert_eq!(issue.severity.as_deref(), Some("major"));
    assert_eq!(issue.span.offsets(), Some((3, 7)));
}

#[test]
fn original_text_may_carry_its_own_span() {
    let issue = normalize_issue(&json!({
        "id": "f-2",
        "original_text": { "text": "recieve", "start": 4, "end": 11 },
        "suggested_text": "receive"
    }))
    .unwrap();
    assert_eq!(issue.span.offsets(), Some((4, 11)));
    assert_eq!(issue.category, "general");
}

#[test]
fn suggestions_are_entity_decoded_and_empty_means_none() {
    let decoded = normalize_issue(&json!({
        "id": "a", "evidence": "Tom and Jerry", "suggestion": "Tom &amp; Jerry"
    }))
    .unwrap();
    assert_eq!(decoded.suggestion(), Some("Tom & Jerry"));

    let empty = normalize_issue(&json!({ "id": "b", "original_text": "x", "suggested_text": "" })).unwrap();
    assert_eq!(empty.suggestion(), None);
}

#[test]
fn frontend_fields_win_when_both_shapes_are_present() {
    let value = json!({ "id": "c", "original_text": "a", "evidence": "b" });
    assert_eq!(detect_shape(&value), Some(WireShape::Frontend));
    assert_eq!(detect_shape(&json!({ "id": "d" })), None);
    assert!(normalize_issue(&json!({ "id": "d" })).is_err());
}

#[test]
fn item_skips_bad_issues_and_filters_persisted_decisions() {
    let item = parse_item(
        &json!({
            "id": 7,
            "article_id": 99,
            "title": "Council vote",
            "content": "<p>The council <b>voted</b> yesterday.</p>",
            "proofreading_issues": [
                { "id": "1", "original_text": "voted", "suggested_text": "voted unanimously" },
                { "id": "1", "original_text": "dup" },
                { "id": "2" },
                { "id": "3", "evidence": "yesterday", "suggestion": "on Tuesday" }
            ],
            "proofreading_stats": { "total_issues": 4, "by_category": { "style": 2 } },
            "proofreading_decisions": [
                { "issue_id": "1", "decision_type": "accepted", "feedback_provided": false },
                { "issue_id": "ghost", "decision_type": "rejected" },
                { "issue_id": "1", "decision_type": "rejected" }
            ]
        })
        .to_string(),
    )
    .unwrap();

    let ids: Vec<&str> = item.issues.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "3"]);
    assert_eq!(item.stats.total_issues, 4);
    assert_eq!(item.stats.by_category.get("style"), Some(&2));
    assert_eq!(item.persisted.len(), 1);
    assert_eq!(item.persisted["1"].decision_type, DecisionType::Rejected);
}

#[test]
fn missing_optional_fields_use_defaults() {
    let item = parse_item(r#"{ "id": 3 }"#).unwrap();
    assert_eq!(item.article_id, None);
    assert!(item.title.is_empty());
    assert!(item.issues.is_empty());
    assert_eq!(item.stats.total_issues, 0);
}

#[test]
fn malformed_optional_fields_do_not_drop_the_issue() {
    let item = parse_item(
        &json!({
            "id": 11,
            "content": "<p>I saw teh big dog run.</p>",
            "proofreading_issues": [
                { "id": "a", "original_text": "teh", "suggested_text": "the", "start": -1, "end": 3 },
                { "id": "b", "evidence": "big", "suggestion": "large", "confidence": "high", "severity": 3 },
                { "id": "c", "original_text": "dog", "position": { "start": 4.0, "end": 7.0 } },
                { "id": "d", "original_text": { "text": "cat", "start": "x" }, "rule_id": false }
            ]
        })
        .to_string(),
    )
    .unwrap();

    let ids: Vec<&str> = item.issues.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c", "d"]);
    assert_eq!(item.issues[0].span.offsets(), None);
    assert_eq!(item.issues[1].confidence, None);
    assert_eq!(item.issues[1].severity, None);
    assert_eq!(item.issues[2].span.offsets(), None);
    assert_eq!(item.issues[3].original_text(), Some("cat"));

    let plain = PlainText::from_html(&item.content);
    let resolved: Vec<_> =
        item.issues.iter().map(|issue| position::resolve(&plain, issue)).collect();
    assert!(matches!(&resolved[0], Resolution::Resolved(p) if (p.start, p.end) == (6, 9)));
    assert!(matches!(&resolved[1], Resolution::Resolved(p) if (p.start, p.end) == (10, 13)));
    assert!(matches!(&resolved[2], Resolution::Resolved(p) if (p.start, p.end) == (14, 17)));
    assert!(matches!(resolved[3], Resolution::Unresolved));
}

#[test]
fn issues_without_an_id_are_still_skipped() {
    let item = parse_item(
        &json!({
            "id": 12,
            "proofreading_issues": [
                { "original_text": "teh", "suggested_text": "the" },
                { "id": null, "evidence": "big" },
                { "id": "ok", "original_text": "dog" }
            ]
        })
        .to_string(),
    )
    .unwrap();
    let ids: Vec<&str> = item.issues.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["ok"]);
}

#[test]
fn unknown_persisted_decisions_are_skipped_not_fatal() {
    let item = parse_item(
        &json!({
            "id": 13,
            "content": "<p>teh end</p>",
            "proofreading_issues": [
                { "id": "a", "original_text": "teh", "suggested_text": "the" },
                { "id": "b", "original_text": "end", "suggested_text": "End" }
            ],
            "proofreading_decisions": [
                { "issue_id": "a", "decision_type": "pending" },
                { "decision_type": "accepted" },
                { "issue_id": "b", "decision_type": "accepted" }
            ]
        })
        .to_string(),
    )
    .unwrap();

    assert_eq!(item.issues.len(), 2);
    assert_eq!(item.persisted.len(), 1);
    assert_eq!(item.persisted["b"].decision_type, DecisionType::Accepted);
}

#[test]
fn explanation_fields_decide_the_shape_as_a_last_resort() {
    let frontend = json!({ "id": "e", "explanation": "Comma splice", "start": 0, "end": 4 });
    let api = json!({ "id": "m", "message": "Comma splice", "location": { "start": 0, "end": 4 } });
    assert_eq!(detect_shape(&frontend), Some(WireShape::Frontend));
    assert_eq!(detect_shape(&api), Some(WireShape::Api));
    assert_eq!(
        detect_shape(&json!({ "id": "x", "message": "m", "evidence": "e" })),
        Some(WireShape::Api)
    );
    assert_eq!(
        detect_shape(&json!({ "id": "y", "message": "m", "original_text": "o" })),
        Some(WireShape::Frontend)
    );

    let issue = normalize_issue(&api).unwrap();
    assert_eq!(issue.explanation.as_deref(), Some("Comma splice"));
    assert_eq!(issue.span.offsets(), Some((0, 4)));
    assert_eq!(normalize_issue(&frontend).unwrap().span.offsets(), Some((0, 4)));
}
