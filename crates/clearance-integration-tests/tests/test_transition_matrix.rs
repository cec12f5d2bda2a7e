//! # Transition Matrix
//!
//! Every (from, to) pair of statuses is exercised against the engine. Pairs
//! outside the lifecycle graph must be refused without touching the
//! shipment; terminal statuses refuse everything; every edge in the graph
//! refuses callers other than its named actor.

mod common;

use clearance_core::{Role, Session};
use clearance_state::{
    rule_for, ClearanceError, RequiredActor, ShipmentStatus, TransitionEvidence, TRANSITIONS,
};
use common::*;

fn sessions() -> [Session; 3] {
    [sender(), receiver(), agency()]
}

#[test]
fn pairs_outside_graph_are_refused() {
    let h = harness();
    let mut checked = 0;
    for from in ShipmentStatus::ALL {
        for to in ShipmentStatus::ALL {
            if rule_for(from, to).is_some() {
                continue;
            }
            let id = h.seed_in(from);
            let before = h.engine.get(&agency(), id).unwrap();
            for session in sessions() {
                let err = h
                    .engine
                    .request_transition(&session, id, to, TransitionEvidence::default())
                    .unwrap_err();
                if from.is_terminal() {
                    assert!(
                        matches!(err, ClearanceError::Terminal { status } if status == from),
                        "{from} -> {to} as {session}: {err}"
                    );
                } else {
                    assert!(
                        matches!(err, ClearanceError::InvalidTransition { from: f, to: t } if f == from && t == to),
                        "{from} -> {to} as {session}: {err}"
                    );
                }
            }
            let after = h.engine.get(&agency(), id).unwrap();
            assert_eq!(after, before);
            checked += 1;
        }
    }
    let all = ShipmentStatus::ALL.len();
    assert_eq!(checked, all * all - TRANSITIONS.len());
}

#[test]
fn terminal_statuses_have_no_outgoing_edges() {
    for status in ShipmentStatus::ALL {
        if status.is_terminal() {
            assert_eq!(status.outgoing().count(), 0, "{status}");
        } else {
            assert!(status.outgoing().count() > 0, "{status} is a dead end");
        }
    }
}

#[test]
fn edges_refuse_other_actors() {
    let h = harness();
    for rule in TRANSITIONS {
        for session in sessions() {
            // The seeded shipment is DDP, so the duty payer is the sender.
            let permitted = match rule.actor {
                RequiredActor::Agency | RequiredActor::AgencyOrSystem => {
                    session.role == Role::Agency
                }
                RequiredActor::Sender | RequiredActor::DutyPayer => session.role == Role::Sender,
            };
            if permitted {
                continue;
            }
            let id = h.seed_in(rule.from);
            let err = h
                .engine
                .request_transition(&session, id, rule.to, TransitionEvidence::default())
                .unwrap_err();
            assert!(
                matches!(err, ClearanceError::Unauthorized { .. }),
                "{} -> {} as {session}: {err}",
                rule.from,
                rule.to
            );
            assert_eq!(h.engine.get(&agency(), id).unwrap().status, rule.from);
        }
    }
}

#[test]
fn system_session_only_aborts() {
    for rule in TRANSITIONS {
        let permits = rule
            .actor
            .permits(Role::System, clearance_core::DutyMode::Ddp);
        assert_eq!(permits, rule.to == ShipmentStatus::Aborted, "{rule:?}");
    }
}

#[test]
fn every_non_terminal_status_can_reach_a_terminal_one() {
    for start in ShipmentStatus::ALL {
        let mut frontier = vec![start];
        let mut seen = vec![start];
        let mut reaches_terminal = start.is_terminal();
        while let Some(status) = frontier.pop() {
            for next in status.valid_transitions() {
                if next.is_terminal() {
                    reaches_terminal = true;
                }
                if !seen.contains(&next) {
                    seen.push(next);
                    frontier.push(next);
                }
            }
        }
        assert!(reaches_terminal, "{start} cannot finish");
    }
}
