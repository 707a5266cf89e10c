//! Boundary validation: raw payloads in, typed [`Event`]s out.
//!
//! Transport layers hand the engine loosely-typed payloads (every field
//! optional, kinds as strings). [`validate_event`] checks them field by field
//! in a fixed order and stops at the first violation, so the caller always
//! gets exactly one offending field back. Nothing downstream of this module
//! ever sees an unchecked value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ValidationConfig;
use crate::error::{GrudgeError, Result};
use crate::events::{
    CombatEvent, CombatKind, EnvironmentalEvent, EnvironmentalKind, Event, SocialEvent, SocialKind,
};
use crate::types::{AgentId, CounterpartKind};

/// Event family named by an ingestion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventFamily {
    /// Combat events.
    Combat,
    /// Social events.
    Social,
    /// Environmental events.
    Environmental,
}

impl EventFamily {
    /// Parse a family name.
    ///
    /// # Errors
    /// Returns a validation error on the `kind` field for unknown names.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "combat" => Ok(Self::Combat),
            "social" => Ok(Self::Social),
            "environmental" => Ok(Self::Environmental),
            other => Err(GrudgeError::invalid(
                "kind",
                format!("unknown event family '{other}' (expected combat, social or environmental)"),
            )),
        }
    }
}

/// An unvalidated event payload as it arrives from a transport.
///
/// Field names follow the game-side wire format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Kind within the family (`attacked_by`, `gift_received`, ...).
    #[serde(default)]
    pub event_type: Option<String>,
    /// Counterpart name (combat and social).
    #[serde(default)]
    pub entity_name: Option<String>,
    /// Counterpart kind (combat): `player`, `mob` or `npc`.
    #[serde(default)]
    pub entity_type: Option<String>,
    /// Damage amount (combat).
    #[serde(default)]
    pub damage: Option<f64>,
    /// Weapon name (combat).
    #[serde(default)]
    pub weapon: Option<String>,
    /// Location string (combat and environmental).
    #[serde(default)]
    pub location: Option<String>,
    /// Chat message (social).
    #[serde(default)]
    pub message: Option<String>,
    /// Item name (social).
    #[serde(default)]
    pub item: Option<String>,
    /// Description (environmental).
    #[serde(default)]
    pub description: Option<String>,
    /// RFC 3339 timestamp. Defaults to the ingestion time.
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Validate an agent identifier.
///
/// # Errors
/// Returns a validation error on `agent_id` if it is blank, too long or
/// contains control characters.
pub fn validate_agent_id(raw: &str, config: &ValidationConfig) -> Result<AgentId> {
    check_name("agent_id", raw, config).map(AgentId::new)
}

/// Check an already-typed event against the same limits a raw payload
/// must meet: counterpart name and damage.
///
/// # Errors
/// Returns [`GrudgeError::Validation`] naming the first offending field.
pub fn check_typed_event(event: &Event, config: &ValidationConfig) -> Result<()> {
    match event {
        Event::Combat(e) => {
            check_stored_name(&e.counterpart, config)?;
            if let Some(damage) = e.damage {
                check_damage(damage, config)?;
            }
        }
        Event::Social(e) => {
            check_stored_name(&e.counterpart, config)?;
        }
        Event::Environmental(_) => {}
    }
    Ok(())
}

/// Validate a raw payload of the given family into a typed [`Event`].
///
/// `now` stamps payloads that carry no timestamp.
///
/// # Errors
/// Returns [`GrudgeError::Validation`] naming the first offending field.
pub fn validate_event(
    family: EventFamily,
    raw: &RawEvent,
    config: &ValidationConfig,
    now: DateTime<Utc>,
) -> Result<Event> {
    let event_type = required("event_type", raw.event_type.as_deref())?;

    match family {
        EventFamily::Combat => {
            let kind = CombatKind::parse(event_type).ok_or_else(|| {
                unknown_kind(event_type, CombatKind::ALL.map(CombatKind::as_str))
            })?;
            let counterpart = check_name("entity_name", required("entity_name", raw.entity_name.as_deref())?, config)?;
            let entity_type = required("entity_type", raw.entity_type.as_deref())?;
            let counterpart_kind = CounterpartKind::parse(entity_type).ok_or_else(|| {
                GrudgeError::invalid(
                    "entity_type",
                    format!("unknown counterpart kind '{entity_type}' (expected player, mob or npc)"),
                )
            })?;
            let damage = raw.damage.map(|d| check_damage(d, config)).transpose()?;
            let weapon = optional_text("weapon", raw.weapon.as_deref(), config)?;
            let location = optional_text("location", raw.location.as_deref(), config)?;
            let timestamp = parse_timestamp(raw.timestamp.as_deref(), now)?;

            Ok(Event::Combat(CombatEvent {
                kind,
                counterpart,
                counterpart_kind,
                damage,
                weapon,
                location,
                timestamp,
            }))
        }
        EventFamily::Social => {
            let kind = SocialKind::parse(event_type).ok_or_else(|| {
                unknown_kind(event_type, SocialKind::ALL.map(SocialKind::as_str))
            })?;
            let counterpart = check_name("entity_name", required("entity_name", raw.entity_name.as_deref())?, config)?;
            let message = optional_text("message", raw.message.as_deref(), config)?;
            let item = optional_text("item", raw.item.as_deref(), config)?;
            let timestamp = parse_timestamp(raw.timestamp.as_deref(), now)?;

            Ok(Event::Social(SocialEvent {
                kind,
                counterpart,
                message,
                item,
                timestamp,
            }))
        }
        EventFamily::Environmental => {
            let kind = EnvironmentalKind::parse(event_type).ok_or_else(|| {
                unknown_kind(event_type, EnvironmentalKind::ALL.map(EnvironmentalKind::as_str))
            })?;
            let location = optional_text("location", raw.location.as_deref(), config)?;
            let description = required("description", raw.description.as_deref())?;
            if description.trim().is_empty() {
                return Err(GrudgeError::invalid("description", "must not be empty"));
            }
            let description = optional_text("description", Some(description), config)?
                .unwrap_or_default();
            let timestamp = parse_timestamp(raw.timestamp.as_deref(), now)?;

            Ok(Event::Environmental(EnvironmentalEvent {
                kind,
                description,
                location,
                timestamp,
            }))
        }
    }
}

// ---------------------------------------------------------------------------
// Field checks
// ---------------------------------------------------------------------------

fn required<'a>(field: &'static str, value: Option<&'a str>) -> Result<&'a str> {
    value.ok_or_else(|| GrudgeError::invalid(field, "is required"))
}

fn unknown_kind<const N: usize>(got: &str, expected: [&'static str; N]) -> GrudgeError {
    GrudgeError::invalid(
        "event_type",
        format!("unknown event type '{got}' (expected one of: {})", expected.join(", ")),
    )
}

fn check_name(field: &'static str, raw: &str, config: &ValidationConfig) -> Result<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(GrudgeError::invalid(field, "must not be empty"));
    }
    let len = name.chars().count();
    if len > config.max_name_chars {
        return Err(GrudgeError::invalid(
            field,
            format!("too long ({len} chars, max: {})", config.max_name_chars),
        ));
    }
    if name.chars().any(char::is_control) {
        return Err(GrudgeError::invalid(field, "must not contain control characters"));
    }
    Ok(name.to_string())
}

fn optional_text(
    field: &'static str,
    raw: Option<&str>,
    config: &ValidationConfig,
) -> Result<Option<String>> {
    let Some(text) = raw else {
        return Ok(None);
    };
    let len = text.chars().count();
    if len > config.max_text_chars {
        return Err(GrudgeError::invalid(
            field,
            format!("too long ({len} chars, max: {})", config.max_text_chars),
        ));
    }
    Ok(Some(text.to_string()))
}

fn check_damage(damage: f64, config: &ValidationConfig) -> Result<f64> {
    if !damage.is_finite() {
        return Err(GrudgeError::invalid("damage", "must be a finite number"));
    }
    if damage < 0.0 {
        return Err(GrudgeError::invalid("damage", format!("must not be negative (got {damage})")));
    }
    if damage > config.max_damage {
        return Err(GrudgeError::invalid(
            "damage",
            format!("exceeds maximum ({damage} > {})", config.max_damage),
        ));
    }
    Ok(damage)
}

/// Ledgers are keyed by the exact name, so a typed event must carry it
/// already trimmed.
fn check_stored_name(name: &str, config: &ValidationConfig) -> Result<()> {
    if check_name("entity_name", name, config)? != name {
        return Err(GrudgeError::invalid("entity_name", "must not start or end with whitespace"));
    }
    Ok(())
}

fn parse_timestamp(raw: Option<&str>, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    match raw {
        None => Ok(now),
        Some(ts) => DateTime::parse_from_rfc3339(ts)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| GrudgeError::invalid("timestamp", format!("not RFC 3339: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn cfg() -> ValidationConfig {
        ValidationConfig::default()
    }

    fn attack(name: &str, damage: Option<f64>) -> RawEvent {
        RawEvent {
            event_type: Some("attacked_by".into()),
            entity_name: Some(name.into()),
            entity_type: Some("player".into()),
            damage,
            weapon: Some("wooden_sword".into()),
            ..RawEvent::default()
        }
    }

    fn field_of(err: &GrudgeError) -> &'static str {
        match err {
            GrudgeError::Validation { field, .. } => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn valid_combat_payload_becomes_typed_event() {
        let now = Utc::now();
        let ev = validate_event(EventFamily::Combat, &attack("  Steve ", Some(3.0)), &cfg(), now)
            .expect("valid");
        let Event::Combat(c) = ev else { panic!("expected combat") };
        assert_eq!(c.kind, CombatKind::AttackedBy);
        assert_eq!(c.counterpart, "Steve");
        assert_eq!(c.counterpart_kind, CounterpartKind::Player);
        assert_eq!(c.damage, Some(3.0));
        assert_eq!(c.timestamp, now);
    }

    #[test]
    fn unknown_family_is_rejected_on_kind() {
        let err = EventFamily::parse("trade").expect_err("unknown");
        assert_eq!(field_of(&err), "kind");
        assert_eq!(err.kind(), ErrorKind::Rejected);
    }

    #[test]
    fn unknown_event_type_lists_expected_values() {
        let mut raw = attack("Steve", None);
        raw.event_type = Some("punched".into());
        let err = validate_event(EventFamily::Combat, &raw, &cfg(), Utc::now()).expect_err("bad");
        assert_eq!(field_of(&err), "event_type");
        assert!(err.to_string().contains("attacked_by, attacked, witnessed_death"));
    }

    #[test]
    fn negative_and_non_finite_damage_rejected() {
        for bad in [-1.0, f64::NAN, f64::INFINITY, 1e9] {
            let err = validate_event(EventFamily::Combat, &attack("Steve", Some(bad)), &cfg(), Utc::now())
                .expect_err("bad damage");
            assert_eq!(field_of(&err), "damage");
        }
    }

    #[test]
    fn first_violation_wins() {
        // Both the name and the damage are bad; the name is checked first.
        let raw = attack("   ", Some(-5.0));
        let err = validate_event(EventFamily::Combat, &raw, &cfg(), Utc::now()).expect_err("bad");
        assert_eq!(field_of(&err), "entity_name");
    }

    #[test]
    fn combat_requires_counterpart_kind() {
        let mut raw = attack("Steve", None);
        raw.entity_type = None;
        let err = validate_event(EventFamily::Combat, &raw, &cfg(), Utc::now()).expect_err("missing");
        assert_eq!(field_of(&err), "entity_type");

        raw.entity_type = Some("dragon".into());
        let err = validate_event(EventFamily::Combat, &raw, &cfg(), Utc::now()).expect_err("unknown");
        assert_eq!(field_of(&err), "entity_type");
    }

    #[test]
    fn social_payload_needs_no_counterpart_kind() {
        let raw = RawEvent {
            event_type: Some("gift_received".into()),
            entity_name: Some("Alex".into()),
            item: Some("diamond".into()),
            ..RawEvent::default()
        };
        let ev = validate_event(EventFamily::Social, &raw, &cfg(), Utc::now()).expect("valid");
        let Event::Social(s) = ev else { panic!("expected social") };
        assert_eq!(s.kind, SocialKind::GiftReceived);
        assert_eq!(s.item.as_deref(), Some("diamond"));
    }

    #[test]
    fn environmental_requires_description() {
        let raw = RawEvent {
            event_type: Some("explosion".into()),
            description: Some("  ".into()),
            ..RawEvent::default()
        };
        let err = validate_event(EventFamily::Environmental, &raw, &cfg(), Utc::now()).expect_err("blank");
        assert_eq!(field_of(&err), "description");
    }

    #[test]
    fn overlong_text_and_names_rejected() {
        let mut raw = attack(&"x".repeat(65), None);
        let err = validate_event(EventFamily::Combat, &raw, &cfg(), Utc::now()).expect_err("long name");
        assert_eq!(field_of(&err), "entity_name");

        raw.entity_name = Some("Steve".into());
        raw.weapon = Some("w".repeat(257));
        let err = validate_event(EventFamily::Combat, &raw, &cfg(), Utc::now()).expect_err("long text");
        assert_eq!(field_of(&err), "weapon");
    }

    #[test]
    fn supplied_timestamp_must_be_rfc3339() {
        let mut raw = attack("Steve", None);
        raw.timestamp = Some("2024-05-01T12:00:00Z".into());
        let ev = validate_event(EventFamily::Combat, &raw, &cfg(), Utc::now()).expect("valid");
        assert_eq!(ev.timestamp().to_rfc3339(), "2024-05-01T12:00:00+00:00");

        raw.timestamp = Some("yesterday".into());
        let err = validate_event(EventFamily::Combat, &raw, &cfg(), Utc::now()).expect_err("bad ts");
        assert_eq!(field_of(&err), "timestamp");
    }

    #[test]
    fn agent_ids_are_trimmed_and_checked() {
        assert_eq!(validate_agent_id(" Professor G ", &cfg()).expect("ok").as_str(), "Professor G");
        assert_eq!(field_of(&validate_agent_id("", &cfg()).expect_err("blank")), "agent_id");
        assert_eq!(field_of(&validate_agent_id("a\u{0}b", &cfg()).expect_err("ctrl")), "agent_id");
    }

    #[test]
    fn typed_events_meet_payload_limits() {
        let now = Utc::now();
        let ok = CombatEvent::new(CombatKind::AttackedBy, "Steve", CounterpartKind::Player, now)
            .with_damage(3.0);
        assert!(check_typed_event(&Event::Combat(ok), &cfg()).is_ok());

        let nan = CombatEvent::new(CombatKind::AttackedBy, "Steve", CounterpartKind::Player, now)
            .with_damage(f64::NAN);
        let err = check_typed_event(&Event::Combat(nan), &cfg()).expect_err("nan");
        assert!(matches!(err, GrudgeError::Validation { field: "damage", .. }));

        let padded = SocialEvent::new(SocialKind::Chat, "Alex ", now);
        let err = check_typed_event(&Event::Social(padded), &cfg()).expect_err("padded");
        assert!(matches!(err, GrudgeError::Validation { field: "entity_name", .. }));
    }
}
