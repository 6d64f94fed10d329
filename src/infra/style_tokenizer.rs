// ============================================================
// Layer 6 — StyleTokenizer
// ============================================================
// Wraps a HuggingFace tokenizer and adds the two style control
// tokens [SAQ] and [JSQ] on top of the base vocabulary.
//
// Invariants held after construction:
//   - both style tokens have ids outside the base vocabulary
//   - the two style ids are distinct
//   - pad and end-of-sequence ids exist
//
// Every encoded sequence ends with the end-of-sequence id, even
// after truncation, so the encoder always sees where the passage
// stops.

use anyhow::Result;
use tokenizers::{AddedToken, Tokenizer};

use crate::domain::style::QuestionStyle;
use crate::error::QgError;
use crate::infra::tokenizer_store::{EOS_TOKEN, PAD_TOKEN};

/// Token ids plus the matching attention mask (1 = real, 0 = pad).
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedText {
    pub ids:            Vec<u32>,
    pub attention_mask: Vec<u32>,
}

#[derive(Debug, Clone)]
pub struct StyleTokenizer {
    inner:           Tokenizer,
    pad_id:          u32,
    eos_id:          u32,
    base_vocab_size: usize,
    style_ids:       [u32; 2],
}

impl StyleTokenizer {
    /// Wrap `inner` using the default `<pad>` / `</s>` token names.
    pub fn new(inner: Tokenizer) -> Result<Self, QgError> {
        Self::with_special_tokens(inner, PAD_TOKEN, EOS_TOKEN)
    }

    pub fn with_special_tokens(mut inner: Tokenizer, pad: &str, eos: &str) -> Result<Self, QgError> {
        let pad_id = inner
            .token_to_id(pad)
            .ok_or_else(|| QgError::MissingSpecialToken(pad.to_string()))?;
        let eos_id = inner
            .token_to_id(eos)
            .ok_or_else(|| QgError::MissingSpecialToken(eos.to_string()))?;

        let base_vocab_size = inner.get_vocab_size(false);

        // Already present when the tokenizer was saved after wrapping; then
        // this adds nothing and the existing ids are reused.
        let added = inner.add_special_tokens(&[
            AddedToken::from(QuestionStyle::ShortAnswer.tag(), true),
            AddedToken::from(QuestionStyle::JumbledSentence.tag(), true),
        ]);
        tracing::debug!("Added {} style tokens", added);

        let mut style_ids = [0u32; 2];
        for style in QuestionStyle::ALL {
            let token = style.tag();
            let id = inner
                .token_to_id(token)
                .ok_or_else(|| QgError::MissingSpecialToken(token.to_string()))?;
            if (id as usize) < base_vocab_size {
                return Err(QgError::StyleTokenCollision { token: token.to_string(), id });
            }
            style_ids[style.id()] = id;
        }
        if style_ids[0] == style_ids[1] {
            return Err(QgError::StyleTokenCollision {
                token: QuestionStyle::JumbledSentence.tag().to_string(),
                id:    style_ids[1],
            });
        }

        Ok(Self { inner, pad_id, eos_id, base_vocab_size, style_ids })
    }

    pub fn pad_id(&self) -> u32 { self.pad_id }

    pub fn eos_id(&self) -> u32 { self.eos_id }

    /// T5 convention: the decoder starts from the pad token.
    pub fn decoder_start_id(&self) -> u32 { self.pad_id }

    pub fn style_token_id(&self, style: QuestionStyle) -> u32 {
        self.style_ids[style.id()]
    }

    pub fn base_vocab_size(&self) -> usize { self.base_vocab_size }

    /// Embedding rows needed to cover every id, style tokens included.
    pub fn vocab_size(&self) -> usize {
        self.inner
            .get_vocab(true)
            .values()
            .max()
            .map_or(0, |&max_id| max_id as usize + 1)
    }

    pub fn inner(&self) -> &Tokenizer { &self.inner }

    /// Tokenise `text`, append the end id and fit the result into
    /// `max_len` positions. With `pad` set, the result is padded to
    /// exactly `max_len`.
    pub fn encode(&self, text: &str, max_len: usize, pad: bool) -> Result<EncodedText> {
        anyhow::ensure!(max_len > 0, "max_len must be at least 1");

        let enc = self
            .inner
            .encode(text, false)
            .map_err(|e| anyhow::anyhow!("Tokenisation error: {e}"))?;

        let mut ids: Vec<u32> = enc.get_ids().to_vec();
        ids.truncate(max_len - 1);
        ids.push(self.eos_id);

        let mut attention_mask = vec![1u32; ids.len()];
        if pad {
            ids.resize(max_len, self.pad_id);
            attention_mask.resize(max_len, 0);
        }
        Ok(EncodedText { ids, attention_mask })
    }

    /// Encode "<tag> <passage>" for a single generation request.
    pub fn encode_prompt(&self, passage: &str, style: QuestionStyle, max_len: usize) -> Result<EncodedText> {
        self.encode(&style.tagged(passage), max_len, false)
    }

    /// Decode ids to text, dropping pad / end / unk / style tokens.
    pub fn decode(&self, ids: &[u32]) -> Result<String> {
        self.inner
            .decode(ids, true)
            .map_err(|e| anyhow::anyhow!("Decode: {e}"))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::infra::tokenizer_store::build_in_memory;

    pub(crate) fn test_tokenizer() -> StyleTokenizer {
        let corpus = vec![
            "We watch movies together.".to_string(),
            "What do we watch together?".to_string(),
            "together / movies / We / watch".to_string(),
            "Tom has a red ball. What does Tom have?".to_string(),
        ];
        StyleTokenizer::new(build_in_memory(&corpus, 64).unwrap()).unwrap()
    }

    #[test]
    fn test_style_tokens_are_outside_base_vocab() {
        let tok = test_tokenizer();
        let saq = tok.style_token_id(QuestionStyle::ShortAnswer);
        let jsq = tok.style_token_id(QuestionStyle::JumbledSentence);
        assert_ne!(saq, jsq);
        assert!(saq as usize >= tok.base_vocab_size());
        assert!(jsq as usize >= tok.base_vocab_size());
        assert_eq!(tok.vocab_size(), tok.base_vocab_size() + 2);
    }

    #[test]
    fn test_wrapping_twice_keeps_ids() {
        let tok = test_tokenizer();
        let again = StyleTokenizer::new(tok.inner().clone()).unwrap();
        assert_eq!(again.vocab_size(), tok.vocab_size());
        assert_eq!(
            again.style_token_id(QuestionStyle::ShortAnswer),
            tok.style_token_id(QuestionStyle::ShortAnswer)
        );
    }

    #[test]
    fn test_prompt_starts_with_style_token_and_ends_with_eos() {
        let tok = test_tokenizer();
        let enc = tok
            .encode_prompt("We watch movies together.", QuestionStyle::JumbledSentence, 32)
            .unwrap();
        assert_eq!(enc.ids[0], tok.style_token_id(QuestionStyle::JumbledSentence));
        assert_eq!(*enc.ids.last().unwrap(), tok.eos_id());
        assert!(enc.attention_mask.iter().all(|&m| m == 1));
    }

    #[test]
    fn test_truncation_keeps_eos_and_padding_fills() {
        let tok = test_tokenizer();
        let short = tok.encode("We watch movies together.", 3, true).unwrap();
        assert_eq!(short.ids.len(), 3);
        assert_eq!(short.ids[2], tok.eos_id());

        let padded = tok.encode("We watch", 8, true).unwrap();
        assert_eq!(padded.ids.len(), 8);
        assert_eq!(padded.attention_mask, vec![1, 1, 1, 0, 0, 0, 0, 0]);
        assert_eq!(padded.ids[7], tok.pad_id());
    }

    #[test]
    fn test_decode_skips_special_tokens() {
        let tok = test_tokenizer();
        let enc = tok.encode_prompt("We watch movies", QuestionStyle::ShortAnswer, 16).unwrap();
        let mut ids = enc.ids.clone();
        ids.push(tok.pad_id());
        assert_eq!(tok.decode(&ids).unwrap(), "we watch movies");
    }

    #[test]
    fn test_missing_pad_token_is_rejected() {
        let tok = test_tokenizer();
        let err = StyleTokenizer::with_special_tokens(tok.inner().clone(), "[PAD]", "</s>").unwrap_err();
        assert_eq!(err, QgError::MissingSpecialToken("[PAD]".to_string()));
    }
}
