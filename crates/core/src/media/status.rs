//! Lifecycle status of a media entity.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::converter::ConversionTarget;

/// What a client may currently do with an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Duplicate of a better companion; not shown.
    Hidden,
    /// Cannot be played as is; a conversion is needed.
    #[default]
    Unplayable,
    /// Playable video, but subtitle files still need extracting.
    MissingSubtitles,
    /// A conversion job is waiting in the queue.
    Queued,
    /// A job is running a step that does not yet produce streamable bytes.
    Converting,
    /// The stream step is running; its output can be read progressively.
    Streamable,
    /// Ready to play.
    Playable,
}

impl Status {
    /// Stable states only change through a new job or a file change.
    pub fn is_stable(&self) -> bool {
        matches!(
            self,
            Self::Hidden | Self::Unplayable | Self::MissingSubtitles | Self::Playable
        )
    }

    /// Whether a conversion can improve this state.
    pub fn needs_conversion(&self) -> bool {
        matches!(self, Self::Unplayable | Self::MissingSubtitles)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hidden => "hidden",
            Self::Unplayable => "unplayable",
            Self::MissingSubtitles => "missing_subtitles",
            Self::Queued => "queued",
            Self::Converting => "converting",
            Self::Streamable => "streamable",
            Self::Playable => "playable",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress of the job tracked for an entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JobPhase {
    /// Negative while queued, 0-100 once running.
    pub percent: f32,
    /// Which step is running.
    pub target: ConversionTarget,
}

impl JobPhase {
    pub fn queued() -> Self {
        Self {
            percent: -1.0,
            target: ConversionTarget::Subtitles,
        }
    }
}

/// What the companion looks like from this entity's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompanionState {
    /// The companion's last derived status.
    pub status: Status,
    /// Whether the companion wins the duplicate tie-break.
    pub preferred_over_self: bool,
}

/// Everything the status depends on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusInputs {
    /// The technical profile passed playback acceptance.
    pub acceptable: bool,
    /// Every expected subtitle file is present.
    pub subtitles_complete: bool,
    /// Extraction failed; conversions carry the subtitles in the picture.
    pub subtitles_burned: bool,
    pub companion: Option<CompanionState>,
    pub job: Option<JobPhase>,
}

/// Result of [`derive_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusOutcome {
    pub status: Status,
    /// The companion must re-derive its own status.
    pub refresh_companion: bool,
}

/// Derives the status from its inputs. Pure: equal inputs give equal output.
pub fn derive_status(inputs: &StatusInputs) -> StatusOutcome {
    if let Some(job) = inputs.job {
        let status = if job.percent < 0.0 {
            Status::Queued
        } else if job.target == ConversionTarget::Stream {
            Status::Streamable
        } else {
            Status::Converting
        };
        return StatusOutcome {
            status,
            refresh_companion: false,
        };
    }

    let base = if !inputs.acceptable {
        Status::Unplayable
    } else if !inputs.subtitles_complete {
        Status::MissingSubtitles
    } else {
        Status::Playable
    };

    let Some(companion) = inputs.companion else {
        return StatusOutcome {
            status: base,
            refresh_companion: false,
        };
    };

    match (base, companion.status) {
        (Status::Playable, Status::Unplayable | Status::MissingSubtitles) => StatusOutcome {
            status: Status::Playable,
            refresh_companion: true,
        },
        // The companion is the burned-in rendition.
        (Status::MissingSubtitles, Status::Playable) if inputs.subtitles_burned => {
            StatusOutcome {
                status: Status::Hidden,
                refresh_companion: false,
            }
        }
        (Status::Unplayable, Status::Playable) => StatusOutcome {
            status: Status::Hidden,
            refresh_companion: false,
        },
        (Status::Unplayable, Status::Unplayable) if companion.preferred_over_self => {
            StatusOutcome {
                status: Status::Hidden,
                refresh_companion: false,
            }
        }
        (Status::Unplayable, Status::Unplayable) => StatusOutcome {
            status: Status::Unplayable,
            refresh_companion: true,
        },
        (status, _) => StatusOutcome {
            status,
            refresh_companion: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(acceptable: bool, subtitles_complete: bool) -> StatusInputs {
        StatusInputs {
            acceptable,
            subtitles_complete,
            subtitles_burned: false,
            companion: None,
            job: None,
        }
    }

    fn companion(status: Status, preferred_over_self: bool) -> Option<CompanionState> {
        Some(CompanionState {
            status,
            preferred_over_self,
        })
    }

    #[test]
    fn test_stable_states_without_job() {
        assert_eq!(derive_status(&inputs(false, true)).status, Status::Unplayable);
        assert_eq!(derive_status(&inputs(false, false)).status, Status::Unplayable);
        assert_eq!(
            derive_status(&inputs(true, false)).status,
            Status::MissingSubtitles
        );
        assert_eq!(derive_status(&inputs(true, true)).status, Status::Playable);
    }

    #[test]
    fn test_job_progress_states() {
        let mut input = inputs(false, true);

        input.job = Some(JobPhase::queued());
        assert_eq!(derive_status(&input).status, Status::Queued);

        input.job = Some(JobPhase {
            percent: 10.0,
            target: ConversionTarget::Subtitles,
        });
        assert_eq!(derive_status(&input).status, Status::Converting);

        input.job = Some(JobPhase {
            percent: 40.0,
            target: ConversionTarget::Stream,
        });
        assert_eq!(derive_status(&input).status, Status::Streamable);

        input.job = Some(JobPhase {
            percent: -1.0,
            target: ConversionTarget::Stream,
        });
        assert_eq!(derive_status(&input).status, Status::Queued);
    }

    #[test]
    fn test_job_overrides_companion_rules() {
        let mut input = inputs(false, true);
        input.companion = companion(Status::Playable, false);
        input.job = Some(JobPhase::queued());

        let outcome = derive_status(&input);
        assert_eq!(outcome.status, Status::Queued);
        assert!(!outcome.refresh_companion);
    }

    #[test]
    fn test_playable_refreshes_unplayable_companion() {
        let mut input = inputs(true, true);
        input.companion = companion(Status::Unplayable, false);

        let outcome = derive_status(&input);
        assert_eq!(outcome.status, Status::Playable);
        assert!(outcome.refresh_companion);
    }

    #[test]
    fn test_unplayable_hidden_behind_playable_companion() {
        let mut input = inputs(false, true);
        input.companion = companion(Status::Playable, false);

        let outcome = derive_status(&input);
        assert_eq!(outcome.status, Status::Hidden);
        assert!(!outcome.refresh_companion);
    }

    #[test]
    fn test_burned_in_original_hidden_behind_playable_companion() {
        let mut original = inputs(true, false);
        original.subtitles_burned = true;
        original.companion = companion(Status::Playable, false);
        let outcome = derive_status(&original);
        assert_eq!(outcome.status, Status::Hidden);
        assert!(!outcome.refresh_companion);

        // extraction still possible: the companion does not carry them
        original.subtitles_burned = false;
        assert_eq!(derive_status(&original).status, Status::MissingSubtitles);

        // the rendition asks the waiting original to re-derive
        let mut rendition = inputs(true, true);
        rendition.companion = companion(Status::MissingSubtitles, false);
        let outcome = derive_status(&rendition);
        assert_eq!(outcome.status, Status::Playable);
        assert!(outcome.refresh_companion);
    }

    #[test]
    fn test_unplayable_duplicates_tie_break() {
        let mut loser = inputs(false, true);
        loser.companion = companion(Status::Unplayable, true);
        assert_eq!(derive_status(&loser).status, Status::Hidden);

        let mut winner = inputs(false, true);
        winner.companion = companion(Status::Unplayable, false);
        let outcome = derive_status(&winner);
        assert_eq!(outcome.status, Status::Unplayable);
        assert!(outcome.refresh_companion);

        // once the loser is hidden the winner settles without another refresh
        winner.companion = companion(Status::Hidden, false);
        let outcome = derive_status(&winner);
        assert_eq!(outcome.status, Status::Unplayable);
        assert!(!outcome.refresh_companion);
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let mut input = inputs(true, false);
        input.companion = companion(Status::Converting, true);
        let first = derive_status(&input);
        for _ in 0..10 {
            assert_eq!(derive_status(&input), first);
        }
        assert_eq!(first.status, Status::MissingSubtitles);
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&Status::MissingSubtitles).unwrap(),
            "\"missing_subtitles\""
        );
        assert!(Status::Playable.is_stable());
        assert!(!Status::Streamable.is_stable());
        assert!(Status::MissingSubtitles.needs_conversion());
        assert!(!Status::Hidden.needs_conversion());
    }
}
