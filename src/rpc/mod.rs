// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! JSON-RPC 2.0 plumbing: line-delimited framing and the reverse-RPC client.
//!
//! The runtime speaks a single bidirectional stream: host requests come in
//! on stdin and are dispatched by the server loop; runtime requests to the
//! host go out on stdout through [`OutboundClient`] and are correlated back
//! by id when their replies arrive on the same stdin.

pub mod codec;
pub mod outbound;

pub use codec::{classify, error_frame, response_frame, Frame, FrameSink, FrameWriter, INTERNAL_ERROR};
pub use outbound::{OutboundClient, DEFAULT_TIMEOUT, SUMMARIZE_TIMEOUT};
