use std::sync::Arc;

use bytes::Bytes;
use rtdlink_frame::{decode_frame, ChecksumStatus, ScanConfig};
use tracing::{debug, info, warn};

use crate::error::BoardError;
use crate::projector::FieldValue;
use crate::scoreboard::Scoreboard;

/// Per-process handling policy shared by every connection.
#[derive(Debug, Clone, Default)]
pub struct BoardConfig {
    /// Reject (and do not acknowledge) frames whose checksum does not match.
    ///
    /// Off by default: controllers in the field are known to send bad sums,
    /// so a mismatch is logged and the frame is applied anyway.
    pub strict_checksum: bool,
    /// Frame scanner limits for each connection.
    pub scan: ScanConfig,
}

/// A patch that was written to the scoreboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchReport {
    pub offset: usize,
    pub text: Bytes,
    pub checksum: ChecksumStatus,
    /// False when the frame header differs from the device literal.
    pub device_header: bool,
    /// False when no template field starts at `offset`.
    pub field_start: bool,
    /// Fields the patch covered, with their values after the write.
    pub fields: Vec<FieldValue>,
}

impl PatchReport {
    /// True when no field starts at the patch offset.
    pub fn is_unknown_offset(&self) -> bool {
        !self.field_start
    }
}

/// What happened to one raw frame.
#[derive(Debug)]
pub enum FrameOutcome {
    /// The patch was applied.
    Applied(PatchReport),
    /// The frame was dropped without changing the scoreboard.
    Rejected {
        reason: BoardError,
        /// Whether the sender still gets an ACK.
        acknowledged: bool,
    },
}

impl FrameOutcome {
    /// True when an ACK must be written back to the sender.
    pub fn requires_ack(&self) -> bool {
        match self {
            FrameOutcome::Applied(_) => true,
            FrameOutcome::Rejected { acknowledged, .. } => *acknowledged,
        }
    }
}

/// Decodes raw frames and applies them to the shared scoreboard.
#[derive(Debug, Clone)]
pub struct FrameHandler {
    scoreboard: Arc<Scoreboard>,
    config: BoardConfig,
}

impl FrameHandler {
    pub fn new(scoreboard: Arc<Scoreboard>, config: BoardConfig) -> Self {
        Self { scoreboard, config }
    }

    pub fn scoreboard(&self) -> &Arc<Scoreboard> {
        &self.scoreboard
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    /// Handle one complete SYN..ETB frame received from `peer`.
    ///
    /// | frame                      | scoreboard | ACK |
    /// |----------------------------|------------|-----|
    /// | valid                      | patched    | yes |
    /// | checksum mismatch          | patched    | yes |
    /// | checksum mismatch (strict) | unchanged  | no  |
    /// | patch past buffer end      | unchanged  | yes |
    /// | malformed                  | unchanged  | no  |
    pub fn handle(&self, raw: &Bytes, peer: &str) -> FrameOutcome {
        let frame = match decode_frame(raw) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(peer, len = raw.len(), error = %err, "dropping malformed frame");
                return FrameOutcome::Rejected {
                    reason: BoardError::Frame(err),
                    acknowledged: false,
                };
            }
        };

        let device_header = frame.has_device_header();
        if !device_header {
            warn!(
                peer,
                header = %String::from_utf8_lossy(&frame.header),
                "unexpected frame header"
            );
        }

        if let Err(err) = frame.verify_checksum() {
            if self.config.strict_checksum {
                warn!(peer, error = %err, "rejecting frame");
                return FrameOutcome::Rejected {
                    reason: BoardError::Frame(err),
                    acknowledged: false,
                };
            }
            warn!(peer, error = %err, "applying frame despite checksum mismatch");
        }

        let fields = match self.scoreboard.apply_and_project(frame.offset, &frame.text) {
            Ok(fields) => fields,
            Err(reason) => {
                warn!(
                    peer,
                    offset = frame.offset,
                    len = frame.text.len(),
                    error = %reason,
                    "patch out of bounds"
                );
                return FrameOutcome::Rejected {
                    reason,
                    acknowledged: true,
                };
            }
        };

        let field_start = self
            .scoreboard
            .template()
            .lookup_by_start_offset(frame.offset)
            .is_some();
        if !field_start {
            info!(
                peer,
                checksum = ?frame.checksum,
                offset = frame.offset,
                text = %frame.text_lossy(),
                "unknown offset"
            );
        } else {
            debug!(peer, offset = frame.offset, fields = fields.len(), "patch applied");
        }

        FrameOutcome::Applied(PatchReport {
            offset: frame.offset,
            text: frame.text,
            checksum: frame.checksum,
            device_header,
            field_start,
            fields,
        })
    }
}
