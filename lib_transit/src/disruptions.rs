//! # Disruption Applier
//!
//! Turns a decoded disruption payload into the graph's own [`Disruption`] type
//! and applies it to an owned clone of the graph. Resolution is a pure check
//! against a read view, so the realtime handler can reject an entity before it
//! pays for a clone.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::ResolutionError;
use crate::model::{
    Disruption, Effect, Impact, Metadata, Period, PtData, PtObjectKind, PtObjectRef, Severity,
};
use crate::proto::chaos;

/// Call contract of the disruption mutation logic.
pub trait DisruptionApplier: Send + Sync {
    /// Checks every reference of `payload` against `graph` and converts it.
    fn resolve(
        &self,
        payload: &chaos::Disruption,
        graph: &PtData,
        meta: &Metadata,
    ) -> Result<Disruption, ResolutionError>;

    /// Adds or replaces a resolved disruption.
    fn apply_upsert(&self, disruption: Disruption, graph: &mut PtData, meta: &Metadata);

    /// Removes a disruption, returning it if it was present.
    fn apply_delete(&self, id: &str, graph: &mut PtData, meta: &Metadata) -> Option<Disruption>;
}

/// Applier for disruptions published by the disruption back-office.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChaosApplier;

impl DisruptionApplier for ChaosApplier {
    fn resolve(
        &self,
        payload: &chaos::Disruption,
        graph: &PtData,
        _meta: &Metadata,
    ) -> Result<Disruption, ResolutionError> {
        if payload.id.is_empty() {
            return Err(ResolutionError::MissingId);
        }

        let mut impacts = Vec::with_capacity(payload.impacts.len());
        for impact in &payload.impacts {
            let mut informed = Vec::with_capacity(impact.informed_entities.len());
            for object in &impact.informed_entities {
                let kind = object_kind(&impact.id, object.pt_object_type)?;
                if !graph.contains(kind, &object.uri) {
                    return Err(ResolutionError::UnknownObject {
                        impact: impact.id.clone(),
                        kind: kind.to_string(),
                        uri: object.uri.clone(),
                    });
                }
                informed.push(PtObjectRef {
                    kind,
                    uri: object.uri.clone(),
                });
            }

            impacts.push(Impact {
                uri: impact.id.clone(),
                severity: impact.severity.as_ref().map(severity).unwrap_or_default(),
                application_periods: impact.application_periods.iter().map(period).collect(),
                informed_entities: informed,
                messages: impact.messages.iter().map(|m| m.text.clone()).collect(),
            });
        }

        Ok(Disruption {
            uri: payload.id.clone(),
            reference: payload.reference.clone(),
            cause: payload
                .cause
                .as_ref()
                .map(|c| c.wording.clone())
                .unwrap_or_default(),
            contributor: payload.contributor.clone(),
            publication_period: payload.publication_period.as_ref().map(period),
            impacts,
        })
    }

    fn apply_upsert(&self, mut disruption: Disruption, graph: &mut PtData, meta: &Metadata) {
        let (begin, end) = meta.production_period();
        disruption.impacts.retain_mut(|impact| {
            if impact.application_periods.is_empty() {
                impact.application_periods.push(Period { begin, end });
                return true;
            }
            impact.application_periods = impact
                .application_periods
                .iter()
                .filter_map(|p| p.clip(begin, end))
                .collect();
            if impact.application_periods.is_empty() {
                debug!("impact {} is outside the production period, dropped", impact.uri);
                return false;
            }
            true
        });

        graph.disruptions.insert(disruption.uri.clone(), disruption);
    }

    fn apply_delete(&self, id: &str, graph: &mut PtData, _meta: &Metadata) -> Option<Disruption> {
        graph.disruptions.remove(id)
    }
}

/// Checks that every object a stored disruption informs exists in `graph`.
pub fn check_references(disruption: &Disruption, graph: &PtData) -> Result<(), ResolutionError> {
    for impact in &disruption.impacts {
        for object in &impact.informed_entities {
            if !graph.contains(object.kind, &object.uri) {
                return Err(ResolutionError::UnknownObject {
                    impact: impact.uri.clone(),
                    kind: object.kind.to_string(),
                    uri: object.uri.clone(),
                });
            }
        }
    }
    Ok(())
}

fn object_kind(impact: &str, code: i32) -> Result<PtObjectKind, ResolutionError> {
    match chaos::PtObjectType::try_from(code) {
        Ok(chaos::PtObjectType::Network) => Ok(PtObjectKind::Network),
        Ok(chaos::PtObjectType::Line) => Ok(PtObjectKind::Line),
        Ok(chaos::PtObjectType::Route) => Ok(PtObjectKind::Route),
        Ok(chaos::PtObjectType::StopArea) => Ok(PtObjectKind::StopArea),
        Ok(chaos::PtObjectType::StopPoint) => Ok(PtObjectKind::StopPoint),
        _ => Err(ResolutionError::UnsupportedObjectType {
            impact: impact.to_string(),
            code,
        }),
    }
}

fn severity(s: &chaos::Severity) -> Severity {
    let effect = match chaos::Effect::try_from(s.effect) {
        Ok(chaos::Effect::NoService) => Effect::NoService,
        Ok(chaos::Effect::ReducedService) => Effect::ReducedService,
        Ok(chaos::Effect::SignificantDelays) => Effect::SignificantDelays,
        Ok(chaos::Effect::Detour) => Effect::Detour,
        Ok(chaos::Effect::AdditionalService) => Effect::AdditionalService,
        Ok(chaos::Effect::ModifiedService) => Effect::ModifiedService,
        Ok(chaos::Effect::OtherEffect) => Effect::OtherEffect,
        Ok(chaos::Effect::StopMoved) => Effect::StopMoved,
        Ok(chaos::Effect::UnknownEffect) | Err(_) => Effect::UnknownEffect,
    };
    Severity {
        uri: s.id.clone(),
        wording: s.wording.clone(),
        effect,
        priority: s.priority,
    }
}

/// An `end` of 0 means the range is open.
fn period(range: &chaos::TimeRange) -> Period {
    let begin = timestamp(range.start).unwrap_or(DateTime::<Utc>::MIN_UTC);
    let end = match range.end {
        0 => DateTime::<Utc>::MAX_UTC,
        secs => timestamp(secs).unwrap_or(DateTime::<Utc>::MAX_UTC),
    };
    Period { begin, end }
}

fn timestamp(secs: u64) -> Option<DateTime<Utc>> {
    i64::try_from(secs)
        .ok()
        .and_then(|s| DateTime::from_timestamp(s, 0))
}
