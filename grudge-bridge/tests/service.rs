//! End-to-end request flows through `GrudgeService::handle_json`.

use grudge_bridge::{BridgeConfig, GrudgeService};
use serde_json::{Value, json};

fn config_in(dir: &std::path::Path) -> BridgeConfig {
    BridgeConfig::from_toml(&format!(
        r#"
        [persistence]
        backend = "json"
        path = "{}"
        "#,
        dir.join("npc_memory.json").display()
    ))
    .expect("config")
}

fn call(svc: &GrudgeService, req: &Value) -> Value {
    serde_json::from_str(&svc.handle_json(&req.to_string())).expect("reply is JSON")
}

fn attack(agent: &str, name: &str, damage: f64) -> Value {
    json!({
        "op": "ingest",
        "agent_id": agent,
        "kind": "combat",
        "payload": {
            "event_type": "attacked_by",
            "entity_name": name,
            "entity_type": "player",
            "damage": damage,
            "weapon": "wooden_sword"
        }
    })
}

#[test]
fn repeated_attacks_turn_into_a_threat() {
    let dir = tempfile::tempdir().expect("tempdir");
    let svc = GrudgeService::from_config(config_in(dir.path())).expect("service");

    let first = call(&svc, &attack("Professor G", "Steve", 3.0));
    assert_eq!(first["status"], "ok");
    assert_eq!(first["created"], true);
    assert_eq!(first["saved"], true);
    assert_eq!(first["relationship"]["combat_stats"]["times_attacked_by"], 1);

    call(&svc, &attack("Professor G", "Steve", 4.0));
    let third = call(&svc, &attack("Professor G", "Steve", 5.0));
    assert_eq!(third["created"], false);
    assert!(third["relationship"]["trust"].as_i64().expect("trust") <= -40);
    assert_eq!(third["relationship"]["should_attack"], true);
    assert_eq!(third["relationship"]["recommendations"]["should_attack"], true);

    let rel = call(
        &svc,
        &json!({ "op": "relationship", "agent_id": "Professor G", "counterpart": "Steve" }),
    );
    assert_eq!(rel["result"], "known");
    assert_eq!(rel["relationship"]["counterpart"], "Steve");

    let summary = call(&svc, &json!({ "op": "summary", "agent_id": "Professor G" }));
    assert_eq!(summary["current_threat"], "Steve");
    assert_eq!(summary["total_combat_events"], 3);
    let text = summary["context_summary_text"].as_str().expect("text");
    assert!(text.contains("THREAT: Steve is hostile!"));
}

#[test]
fn gifts_make_a_friend() {
    let dir = tempfile::tempdir().expect("tempdir");
    let svc = GrudgeService::from_config(config_in(dir.path())).expect("service");

    for item in ["diamond", "gold_ingot"] {
        call(
            &svc,
            &json!({
                "op": "ingest",
                "agent_id": "Professor G",
                "kind": "social",
                "payload": { "event_type": "gift_received", "entity_name": "Alex", "item": item }
            }),
        );
    }

    let rel = call(
        &svc,
        &json!({ "op": "relationship", "agent_id": "Professor G", "counterpart": "Alex" }),
    );
    assert_eq!(rel["relationship"]["status"], "friendly");
    assert_eq!(rel["relationship"]["trust"], 20);
    assert_eq!(rel["relationship"]["affection"], 30);
    assert_eq!(rel["relationship"]["social_stats"]["gifts_received"], 2);
}

#[test]
fn stranger_is_unknown_not_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let svc = GrudgeService::from_config(config_in(dir.path())).expect("service");

    let rel = call(
        &svc,
        &json!({ "op": "relationship", "agent_id": "Professor G", "counterpart": "Herobrine" }),
    );
    assert_eq!(rel["result"], "unknown");
    assert_eq!(rel["counterpart"], "Herobrine");
    assert!(rel.get("error").is_none());
}

#[test]
fn bad_payload_names_the_field_and_changes_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let svc = GrudgeService::from_config(config_in(dir.path())).expect("service");

    let reply = call(&svc, &attack("Professor G", "Steve", -2.0));
    assert_eq!(reply["error"]["kind"], "rejected");
    assert_eq!(reply["error"]["field"], "damage");
    assert_eq!(svc.manager().agent_count(), 0);

    let blank = call(&svc, &attack("   ", "Steve", 1.0));
    assert_eq!(blank["error"]["field"], "agent_id");

    let metrics = call(&svc, &json!({ "op": "metrics" }));
    let text = metrics["prometheus"].as_str().expect("text");
    assert!(text.contains("grudge_validation_rejections_total 2"));
}

#[test]
fn memory_survives_a_restart_and_delete_sticks() {
    let dir = tempfile::tempdir().expect("tempdir");

    {
        let svc = GrudgeService::from_config(config_in(dir.path())).expect("service");
        call(&svc, &attack("Professor G", "Steve", 3.0));
        call(&svc, &attack("Blacksmith", "Alex", 1.0));
    }

    {
        let svc = GrudgeService::from_config(config_in(dir.path())).expect("service");
        let health = call(&svc, &json!({ "op": "health" }));
        assert_eq!(health["agent_count"], 2);

        let rel = call(
            &svc,
            &json!({ "op": "relationship", "agent_id": "Professor G", "counterpart": "Steve" }),
        );
        assert_eq!(rel["relationship"]["combat_stats"]["times_attacked_by"], 1);

        let deleted = call(&svc, &json!({ "op": "delete", "agent_id": "Blacksmith" }));
        assert_eq!(deleted["deleted"], true);
        assert_eq!(deleted["saved"], true);
        let again = call(&svc, &json!({ "op": "delete", "agent_id": "Blacksmith" }));
        assert_eq!(again["deleted"], false);
    }

    let svc = GrudgeService::from_config(config_in(dir.path())).expect("service");
    assert_eq!(svc.manager().agent_count(), 1);
}
