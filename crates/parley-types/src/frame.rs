//! The binary frame protocol spoken on the client WebSocket.
//!
//! Every message in either direction is a single frame: one kind-tag
//! byte followed by the payload. Audio payloads are opaque bytes; text
//! payloads are UTF-8. A frame that cannot be decoded (empty buffer,
//! unknown tag, or a text payload that is not valid UTF-8) is simply
//! not a frame: `decode` returns `None` and callers drop it.

/// One discrete tagged message unit on the client protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Raw audio from the client microphone, client → gateway.
    VoiceInput(Vec<u8>),
    /// Recognized speech text, gateway → client.
    TranscriptionResult(String),
    /// Synthesized reply audio, gateway → client.
    SynthesisResult(Vec<u8>),
    /// Generated reply text, gateway → client.
    GenerationResult(String),
}

impl Frame {
    pub const TAG_VOICE_INPUT: u8 = 0x01;
    pub const TAG_TRANSCRIPTION_RESULT: u8 = 0x02;
    pub const TAG_SYNTHESIS_RESULT: u8 = 0x03;
    pub const TAG_GENERATION_RESULT: u8 = 0x04;

    /// Returns the kind-tag byte for this frame.
    pub fn tag(&self) -> u8 {
        match self {
            Self::VoiceInput(_) => Self::TAG_VOICE_INPUT,
            Self::TranscriptionResult(_) => Self::TAG_TRANSCRIPTION_RESULT,
            Self::SynthesisResult(_) => Self::TAG_SYNTHESIS_RESULT,
            Self::GenerationResult(_) => Self::TAG_GENERATION_RESULT,
        }
    }

    /// Encodes the frame as tag byte + payload bytes.
    pub fn encode(&self) -> Vec<u8> {
        let payload: &[u8] = match self {
            Self::VoiceInput(bytes) | Self::SynthesisResult(bytes) => bytes,
            Self::TranscriptionResult(text) | Self::GenerationResult(text) => text.as_bytes(),
        };
        let mut out = Vec::with_capacity(1 + payload.len());
        out.push(self.tag());
        out.extend_from_slice(payload);
        out
    }

    /// Decodes a frame from raw bytes.
    ///
    /// Returns `None` for an empty buffer, an unrecognized tag, or a
    /// text-kind payload that is not valid UTF-8. Undecodable input has
    /// no error effect; it is dropped by the caller.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let (&tag, payload) = bytes.split_first()?;
        match tag {
            Self::TAG_VOICE_INPUT => Some(Self::VoiceInput(payload.to_vec())),
            Self::TAG_TRANSCRIPTION_RESULT => Some(Self::TranscriptionResult(
                std::str::from_utf8(payload).ok()?.to_owned(),
            )),
            Self::TAG_SYNTHESIS_RESULT => Some(Self::SynthesisResult(payload.to_vec())),
            Self::TAG_GENERATION_RESULT => Some(Self::GenerationResult(
                std::str::from_utf8(payload).ok()?.to_owned(),
            )),
            _ => None,
        }
    }
}
