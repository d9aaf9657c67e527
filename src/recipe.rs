use std::sync::Arc;

use crate::intake::{Blob, BlobReader};
use crate::llm::{ContentPart, GenerateRequest, GenerativeModel, LlmError, Message, Role};

pub const MODEL_ID: &str = "gemini-1.5-flash";

pub const SYSTEM_INSTRUCTION: &str = "Anda adalah asisten AI yang ahli dalam memasak. \
Tugas Anda adalah memberikan resep masakan lengkap, termasuk bahan-bahan dan langkah-langkah \
memasaknya, berdasarkan permintaan atau gambar yang diberikan oleh pengguna. Pastikan respons \
Anda hanya berisi resep dan tidak ada informasi lain. Jika permintaan tidak terkait dengan \
resep, jawablah dengan sopan bahwa Anda hanya dapat membantu dengan resep masakan.";

#[derive(Debug, thiserror::Error)]
pub enum RecipeError {
    #[error("could not read {name}: {source:#}")]
    Read {
        name: String,
        #[source]
        source: anyhow::Error,
    },
    #[error(transparent)]
    Model(#[from] LlmError),
}

/// A selected file, already base64-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub data: String,
    pub media_type: String,
}

/// One user turn: the prompt verbatim, then the file if there is one.
#[must_use]
pub fn build_messages(prompt: &str, file: Option<Attachment>) -> Vec<Message> {
    let mut content = vec![ContentPart::Text {
        text: prompt.to_string(),
    }];
    if let Some(Attachment { data, media_type }) = file {
        content.push(ContentPart::File { data, media_type });
    }
    vec![Message {
        role: Role::User,
        content,
    }]
}

#[must_use]
pub fn build_request(prompt: &str, file: Option<Attachment>) -> GenerateRequest {
    GenerateRequest {
        model: MODEL_ID.to_string(),
        system: SYSTEM_INSTRUCTION.to_string(),
        messages: build_messages(prompt, file),
    }
}

/// Turns a prompt (and optional photo/PDF) into recipe text.
#[derive(Debug, Clone)]
pub struct RecipeService {
    model: Arc<dyn GenerativeModel>,
    reader: Arc<dyn BlobReader>,
}

impl RecipeService {
    #[must_use]
    pub fn new(model: Arc<dyn GenerativeModel>, reader: Arc<dyn BlobReader>) -> Self {
        Self { model, reader }
    }

    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.model.provider_name()
    }

    async fn attach(&self, blob: &Blob) -> Result<Attachment, RecipeError> {
        let data = self
            .reader
            .read_as_base64(blob)
            .await
            .map_err(|source| RecipeError::Read {
                name: blob.name().to_string(),
                source,
            })?;
        Ok(Attachment {
            data,
            media_type: blob.mime().to_string(),
        })
    }

    /// No retry and no fallback text.
    ///
    /// # Errors
    ///
    /// Returns the model client's error unchanged, or a read error if the
    /// file could not be encoded (the model is not called then).
    pub async fn generate_recipe(
        &self,
        prompt: &str,
        file: Option<&Blob>,
    ) -> Result<String, RecipeError> {
        let attachment = match file {
            Some(blob) => Some(self.attach(blob).await?),
            None => None,
        };
        let req = build_request(prompt, attachment);
        tracing::info!(
            provider = self.model.provider_name(),
            prompt_chars = prompt.chars().count(),
            file = file.map(Blob::name),
            "generating recipe"
        );
        let resp = self.model.generate_text(&req).await?;
        Ok(resp.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::Base64Reader;
    use crate::llm::FakeModel;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts reads and hands back a fixed payload.
    #[derive(Debug, Default)]
    struct CountingReader {
        reads: AtomicUsize,
    }

    #[async_trait]
    impl BlobReader for CountingReader {
        async fn read_as_data_url(&self, _blob: &Blob) -> anyhow::Result<String> {
            anyhow::bail!("not used")
        }

        async fn read_as_base64(&self, _blob: &Blob) -> anyhow::Result<String> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok("ENCODED".into())
        }
    }

    #[derive(Debug)]
    struct BrokenReader;

    #[async_trait]
    impl BlobReader for BrokenReader {
        async fn read_as_data_url(&self, _blob: &Blob) -> anyhow::Result<String> {
            anyhow::bail!("disk gone")
        }

        async fn read_as_base64(&self, _blob: &Blob) -> anyhow::Result<String> {
            anyhow::bail!("disk gone")
        }
    }

    fn service(model: Arc<FakeModel>) -> RecipeService {
        RecipeService::new(model, Arc::new(Base64Reader))
    }

    #[test]
    fn empty_prompt_without_file_is_one_text_part() {
        let msgs = build_messages("", None);
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].role, Role::User);
        assert_eq!(
            msgs[0].content,
            vec![ContentPart::Text {
                text: String::new()
            }]
        );
    }

    #[test]
    fn file_part_follows_text() {
        let msgs = build_messages(
            "apa resep ayam",
            Some(Attachment {
                data: "YXlhbQ==".into(),
                media_type: "image/jpeg".into(),
            }),
        );
        assert_eq!(
            msgs[0].content,
            vec![
                ContentPart::Text {
                    text: "apa resep ayam".into()
                },
                ContentPart::File {
                    data: "YXlhbQ==".into(),
                    media_type: "image/jpeg".into()
                },
            ]
        );
    }

    #[test]
    fn prompt_is_not_trimmed() {
        let msgs = build_messages("  soto \n", None);
        assert_eq!(
            msgs[0].content[0],
            ContentPart::Text {
                text: "  soto \n".into()
            }
        );
    }

    #[tokio::test]
    async fn sends_fixed_model_and_instruction() {
        let fake = Arc::new(FakeModel::replying("Bahan: ..."));
        let svc = service(fake.clone());
        let out = svc.generate_recipe("rendang", None).await.unwrap();
        assert_eq!(out, "Bahan: ...");

        let seen = fake.requests();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].model, MODEL_ID);
        assert_eq!(seen[0].system, SYSTEM_INSTRUCTION);
    }

    #[tokio::test]
    async fn file_is_encoded_on_the_blocking_pool() {
        let fake = Arc::new(FakeModel::replying("ok"));
        let svc = service(fake.clone());
        let blob = Blob::new("ayam.jpg", "image/jpeg", b"ayam".to_vec());
        svc.generate_recipe("apa resep ayam", Some(&blob))
            .await
            .unwrap();

        assert_eq!(
            fake.requests()[0].messages[0].content[1],
            ContentPart::File {
                data: "YXlhbQ==".into(),
                media_type: "image/jpeg".into()
            }
        );
    }

    #[tokio::test]
    async fn file_goes_through_the_reader() {
        let fake = Arc::new(FakeModel::replying("ok"));
        let reader = Arc::new(CountingReader::default());
        let svc = RecipeService::new(fake.clone(), reader.clone());

        svc.generate_recipe("soto", None).await.unwrap();
        assert_eq!(reader.reads.load(Ordering::SeqCst), 0);

        let blob = Blob::new("menu.pdf", "application/pdf", b"%PDF".to_vec());
        svc.generate_recipe("soto", Some(&blob)).await.unwrap();
        assert_eq!(reader.reads.load(Ordering::SeqCst), 1);
        assert_eq!(
            fake.requests()[1].messages[0].content[1],
            ContentPart::File {
                data: "ENCODED".into(),
                media_type: "application/pdf".into()
            }
        );
    }

    #[tokio::test]
    async fn unreadable_file_never_reaches_the_model() {
        let fake = Arc::new(FakeModel::replying("ok"));
        let svc = RecipeService::new(fake.clone(), Arc::new(BrokenReader));
        let blob = Blob::new("menu.pdf", "application/pdf", b"%PDF".to_vec());

        let err = svc.generate_recipe("soto", Some(&blob)).await.unwrap_err();
        assert!(matches!(err, RecipeError::Read { ref name, .. } if name == "menu.pdf"));
        assert!(err.to_string().contains("disk gone"));
        assert!(fake.requests().is_empty());
    }

    #[tokio::test]
    async fn model_failure_propagates_once() {
        let fake = Arc::new(FakeModel::failing("quota exceeded"));
        let svc = service(fake.clone());
        let err = svc.generate_recipe("rendang", None).await.unwrap_err();
        assert!(matches!(
            err,
            RecipeError::Model(LlmError::Request(ref m)) if m == "quota exceeded"
        ));
        assert_eq!(err.to_string(), "LLM request failed: quota exceeded");
        assert_eq!(fake.requests().len(), 1);
    }
}
