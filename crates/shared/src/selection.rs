//! Two-click attacker/target selection and the confirm animation gate.
//!
//! The flow is a plain value. Each input returns the next state plus an
//! optional event for the UI; the caller keeps whichever state it wants.
//! There are no timers in here: the caller passes the current time to
//! [`SelectionFlow::tick`] or hands back the [`AnimationTicket`] from its own
//! timer. Every reset bumps a generation so tickets from an earlier animation
//! are ignored.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::{AttackConfig, ConfigError};

pub type BoxId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MapMode {
    #[default]
    View,
    Place,
    Attack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Idle,
    AttackerChosen,
    Ready,
    Animating,
}

/// Identifies one animation run. Only the run that issued it can be completed with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationTicket {
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionEvent {
    AttackerChosen(BoxId),
    Deselected,
    Ready { attacker: BoxId, target: BoxId },
    AnimationStarted {
        attacker: BoxId,
        target: BoxId,
        ticket: AnimationTicket,
        ends_at_ms: u64,
    },
    AnimationFinished { attacker: BoxId, target: BoxId },
    Cancelled,
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("at least {required} boxes are needed to attack, found {found}")]
    PreconditionNotMet { required: usize, found: usize },
    #[error("no attacker and target pair is selected")]
    NotReady,
    #[error("an attack animation is in progress")]
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    AttackerChosen {
        attacker: BoxId,
    },
    Ready {
        attacker: BoxId,
        target: BoxId,
    },
    Animating {
        attacker: BoxId,
        target: BoxId,
        ends_at_ms: u64,
    },
}

/// The flow after an input, plus what the UI should react to.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub flow: SelectionFlow,
    pub event: Option<SelectionEvent>,
}

const MIN_BOXES_FOR_ATTACK: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct SelectionFlow {
    state: State,
    mode: MapMode,
    generation: u64,
    animation_ms: u64,
}

impl SelectionFlow {
    pub fn new(config: &AttackConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(SelectionFlow {
            state: State::Idle,
            mode: MapMode::default(),
            generation: 0,
            animation_ms: config.animation_ms,
        })
    }

    pub fn phase(&self) -> Phase {
        match self.state {
            State::Idle => Phase::Idle,
            State::AttackerChosen { .. } => Phase::AttackerChosen,
            State::Ready { .. } => Phase::Ready,
            State::Animating { .. } => Phase::Animating,
        }
    }

    pub fn mode(&self) -> MapMode {
        self.mode
    }

    pub fn attacker(&self) -> Option<BoxId> {
        match self.state {
            State::Idle => None,
            State::AttackerChosen { attacker }
            | State::Ready { attacker, .. }
            | State::Animating { attacker, .. } => Some(attacker),
        }
    }

    pub fn target(&self) -> Option<BoxId> {
        match self.state {
            State::Ready { target, .. } | State::Animating { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Whether the confirm control should be enabled.
    pub fn can_confirm(&self) -> bool {
        self.phase() == Phase::Ready
    }

    fn with_state(&self, state: State) -> SelectionFlow {
        SelectionFlow {
            state,
            ..self.clone()
        }
    }

    fn reset(&self) -> SelectionFlow {
        SelectionFlow {
            state: State::Idle,
            generation: self.generation + 1,
            ..self.clone()
        }
    }

    fn emit(flow: SelectionFlow, event: SelectionEvent) -> Transition {
        Transition {
            flow,
            event: Some(event),
        }
    }

    fn unchanged(&self) -> Transition {
        Transition {
            flow: self.clone(),
            event: None,
        }
    }

    /// Click on a box. `entity_count` is the number of boxes on the map right now.
    pub fn select(&self, id: BoxId, entity_count: usize) -> Result<Transition, SelectionError> {
        let attacker = match self.state {
            State::Animating { .. } => return Err(SelectionError::Busy),
            State::Idle => None,
            State::AttackerChosen { attacker } | State::Ready { attacker, .. } => Some(attacker),
        };
        // clicking the attacker again drops the whole selection
        if attacker == Some(id) {
            return Ok(Self::emit(self.reset(), SelectionEvent::Deselected));
        }
        // only moves into AttackerChosen or Ready need a second box
        if entity_count < MIN_BOXES_FOR_ATTACK {
            return Err(SelectionError::PreconditionNotMet {
                required: MIN_BOXES_FOR_ATTACK,
                found: entity_count,
            });
        }

        let transition = match attacker {
            None => Self::emit(
                self.with_state(State::AttackerChosen { attacker: id }),
                SelectionEvent::AttackerChosen(id),
            ),
            Some(attacker) => Self::emit(
                self.with_state(State::Ready {
                    attacker,
                    target: id,
                }),
                SelectionEvent::Ready {
                    attacker,
                    target: id,
                },
            ),
        };
        Ok(transition)
    }

    /// Start the attack animation. Only valid from `Ready`.
    pub fn confirm(&self, now_ms: u64) -> Result<Transition, SelectionError> {
        match self.state {
            State::Ready { attacker, target } => {
                let ends_at_ms = now_ms.saturating_add(self.animation_ms);
                let flow = self.with_state(State::Animating {
                    attacker,
                    target,
                    ends_at_ms,
                });
                let ticket = AnimationTicket {
                    generation: flow.generation,
                };
                Ok(Self::emit(
                    flow,
                    SelectionEvent::AnimationStarted {
                        attacker,
                        target,
                        ticket,
                        ends_at_ms,
                    },
                ))
            }
            State::Animating { .. } => Err(SelectionError::Busy),
            _ => Err(SelectionError::NotReady),
        }
    }

    /// Advance the clock. Ends the animation once its duration has elapsed.
    pub fn tick(&self, now_ms: u64) -> Transition {
        match self.state {
            State::Animating {
                attacker,
                target,
                ends_at_ms,
            } if now_ms >= ends_at_ms => Self::emit(
                self.reset(),
                SelectionEvent::AnimationFinished { attacker, target },
            ),
            _ => self.unchanged(),
        }
    }

    /// Timer callback. A ticket from an earlier run is a no-op.
    pub fn complete(&self, ticket: AnimationTicket) -> Transition {
        match self.state {
            State::Animating {
                attacker, target, ..
            } if ticket.generation == self.generation => Self::emit(
                self.reset(),
                SelectionEvent::AnimationFinished { attacker, target },
            ),
            _ => self.unchanged(),
        }
    }

    pub fn cancel(&self) -> Transition {
        match self.state {
            State::AttackerChosen { .. } | State::Ready { .. } => {
                Self::emit(self.reset(), SelectionEvent::Cancelled)
            }
            _ => self.unchanged(),
        }
    }

    /// Selection is scoped to a mode, so any switch clears it, even mid-animation.
    pub fn switch_mode(&self, mode: MapMode) -> Transition {
        let was_idle = self.state == State::Idle;
        let flow = SelectionFlow {
            mode,
            ..self.reset()
        };
        Transition {
            flow,
            event: (!was_idle).then_some(SelectionEvent::Reset),
        }
    }

    /// Apply a fresh box list from the store. Drops the selection if either
    /// side of it was deleted.
    pub fn retain_existing(&self, ids: &[BoxId]) -> Transition {
        let gone = |id: Option<BoxId>| id.is_some_and(|id| !ids.contains(&id));
        if gone(self.attacker()) || gone(self.target()) {
            Self::emit(self.reset(), SelectionEvent::Reset)
        } else {
            self.unchanged()
        }
    }
}
