use std::sync::Arc;

use async_trait::async_trait;
use mcqgen::{
    Difficulty, DocumentIngestor, GenerationStep, GeneratorConfig, GeneratorConfigBuilder, GeneratorError,
    PromptTemplate, PromptTemplates, QuizGenerator, QuizRequest, ResponseSchema,
};
use mcqgen_model::MockLlm;
use mcqgen_rag::{EmbeddingProvider, HashEmbeddingProvider, RagError};
use mcqgen_telemetry::EventCapture;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;

const QUIZ_JSON: &str = r#"{
    "1": {"mcq": "Where does photosynthesis happen?", "options": {"a": "Chloroplasts", "b": "Nucleus"}, "correct": "a"},
    "2": {"mcq": "What do volcanoes erupt?", "options": {"a": "Water", "b": "Magma"}, "correct": "b"}
}"#;

const TWO_TOPICS: &str = "Photosynthesis turns sunlight into sugar.\n\nVolcanoes erupt magma from the mantle.";

struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _text: &str) -> mcqgen_rag::Result<Vec<f32>> {
        Err(RagError::EmbeddingError { provider: "Failing".into(), message: "quota exhausted".into() })
    }

    fn dimensions(&self) -> usize {
        8
    }

    fn name(&self) -> &str {
        "Failing"
    }
}

fn config(model: &str) -> GeneratorConfig {
    GeneratorConfig::builder().model(model).chunk_size(60).chunk_overlap(0).build().unwrap()
}

fn generator(config: GeneratorConfig, llm: Arc<MockLlm>) -> QuizGenerator {
    QuizGenerator::with_components(config, llm, Arc::new(HashEmbeddingProvider::new(4096)))
}

fn request() -> QuizRequest {
    QuizRequest::new(5, "Biology", Difficulty::Medium)
}

#[test]
fn unknown_model_fails_before_anything_else() {
    let err = GeneratorConfig::builder().model("llama-3").build().unwrap_err();
    assert!(matches!(err, GeneratorError::UnsupportedModel(ref id) if id == "llama-3"));

    let err = GeneratorConfigBuilder::from_lookup(|key| (key == "MCQGEN_MODEL").then(|| "palm".to_string()))
        .unwrap()
        .build()
        .unwrap_err();
    assert!(matches!(err, GeneratorError::UnsupportedModel(_)));
}

#[test]
fn missing_credential_is_rejected_at_construction() {
    let config = GeneratorConfig::builder().model("google").build().unwrap();
    let err = QuizGenerator::new(config).unwrap_err();
    assert!(matches!(err, GeneratorError::MissingCredential { variable: "GOOGLE_API_KEY", .. }));
}

#[tokio::test]
async fn direct_family_makes_one_call_with_retrieved_context() {
    let llm = Arc::new(MockLlm::new("gemini").with_response(QUIZ_JSON));
    let config = GeneratorConfig::builder()
        .model("google")
        .chunk_size(60)
        .chunk_overlap(0)
        .top_k(1)
        .build()
        .unwrap();
    let quiz_generator = generator(config, llm.clone());
    let schema = ResponseSchema::builtin().unwrap();

    let index = quiz_generator.process_file("notes.txt", TWO_TOPICS.as_bytes().to_vec()).await.unwrap();
    assert_eq!(index.len(), 2);

    let quiz = quiz_generator
        .generate(&index, &request().with_query("volcanoes magma mantle"), &schema)
        .await
        .unwrap();
    assert!(quiz.is_structured());
    assert_eq!(quiz.question_count(), 2);
    assert!(quiz.to_string().starts_with("1. Where does photosynthesis happen?\n\n"));

    let requests = llm.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].temperature, None);

    let prompt = &requests[0].prompt;
    assert!(prompt.contains("Volcanoes erupt magma from the mantle."));
    assert!(!prompt.contains("Photosynthesis turns sunlight"));
    assert!(prompt.contains("create a quiz of 5 multiple choice questions for Biology students at a Medium difficulty level"));
    assert!(prompt.contains(&schema.to_prompt_json().unwrap()));
}

#[tokio::test]
async fn retrieved_chunks_are_space_joined_in_rank_order() {
    let llm = Arc::new(MockLlm::new("gemini").with_response(QUIZ_JSON));
    let config = GeneratorConfig::builder()
        .chunk_size(60)
        .chunk_overlap(0)
        .top_k(2)
        .build()
        .unwrap();
    let quiz_generator = generator(config, llm.clone());

    let index = quiz_generator.process_file("notes.txt", TWO_TOPICS.as_bytes().to_vec()).await.unwrap();
    quiz_generator
        .generate(&index, &request().with_query("volcanoes magma"), &ResponseSchema::builtin().unwrap())
        .await
        .unwrap();

    let prompt = &llm.requests()[0].prompt;
    assert!(prompt.contains("Volcanoes erupt magma from the mantle. Photosynthesis turns sunlight into sugar."));
}

#[tokio::test]
async fn empty_query_still_retrieves_context() {
    for query in [None, Some("")] {
        let llm = Arc::new(MockLlm::new("gemini").with_response(QUIZ_JSON));
        let quiz_generator = generator(config("google"), llm.clone());
        let index = quiz_generator
            .process_file("notes.txt", b"Tectonic plates drift slowly.".to_vec())
            .await
            .unwrap();

        let mut quiz_request = request();
        quiz_request.query = query.map(str::to_string);
        quiz_generator.generate(&index, &quiz_request, &ResponseSchema::builtin().unwrap()).await.unwrap();

        assert!(llm.requests()[0].prompt.contains("Tectonic plates drift slowly."));
    }
}

#[tokio::test]
async fn refine_family_uses_temperature_and_a_single_pass_by_default() {
    let llm = Arc::new(MockLlm::new("gpt-4").with_response(QUIZ_JSON));
    let quiz_generator = generator(config("gpt-4"), llm.clone());
    let index = quiz_generator.process_file("notes.txt", TWO_TOPICS.as_bytes().to_vec()).await.unwrap();

    let quiz = quiz_generator.generate(&index, &request(), &ResponseSchema::builtin().unwrap()).await.unwrap();
    assert_eq!(quiz.question_count(), 2);

    let requests = llm.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].temperature, Some(0.5));
    assert!(requests[0].prompt.contains("You are an expert MCQ maker"));
}

#[tokio::test]
async fn extra_refine_passes_review_the_previous_quiz() {
    let llm = Arc::new(
        MockLlm::new("gpt-4-turbo")
            .with_response("first draft")
            .with_response("second draft")
            .with_response(QUIZ_JSON),
    );
    let config = GeneratorConfig::builder()
        .model("gpt-4-turbo")
        .chunk_size(60)
        .chunk_overlap(0)
        .refine_passes(2)
        .build()
        .unwrap();
    let quiz_generator = generator(config, llm.clone());
    let index = quiz_generator.process_file("notes.txt", TWO_TOPICS.as_bytes().to_vec()).await.unwrap();

    let quiz = quiz_generator.generate(&index, &request(), &ResponseSchema::builtin().unwrap()).await.unwrap();
    assert!(quiz.is_structured());

    let requests = llm.requests();
    assert_eq!(requests.len(), 3);
    assert!(requests[1].prompt.contains("Quiz_MCQs:\nfirst draft"));
    assert!(requests[1].prompt.contains("for Biology students at a Medium difficulty level"));
    assert!(requests[2].prompt.contains("Quiz_MCQs:\nsecond draft"));
    assert!(requests.iter().all(|r| r.temperature == Some(0.5)));
}

#[tokio::test]
async fn unparseable_model_output_is_returned_raw() {
    let llm = Arc::new(MockLlm::new("gemini").with_response("Here are your questions: ..."));
    let quiz_generator = generator(config("google"), llm);
    let index = quiz_generator.process_file("notes.txt", TWO_TOPICS.as_bytes().to_vec()).await.unwrap();

    let quiz = quiz_generator.generate(&index, &request(), &ResponseSchema::builtin().unwrap()).await.unwrap();
    assert!(!quiz.is_structured());
    assert_eq!(quiz.to_string(), "Here are your questions: ...");
}

#[tokio::test]
async fn model_failures_are_tagged_with_their_step() {
    let schema = ResponseSchema::builtin().unwrap();

    let direct = generator(config("google"), Arc::new(MockLlm::new("gemini").with_failure("401 unauthorized")));
    let index = direct.process_file("notes.txt", TWO_TOPICS.as_bytes().to_vec()).await.unwrap();
    let err = direct.generate(&index, &request(), &schema).await.unwrap_err();
    assert!(matches!(err, GeneratorError::Generation { step: GenerationStep::Invocation, .. }));
    assert!(err.to_string().contains("401 unauthorized"));

    let refine = generator(config("gpt-3.5-turbo"), Arc::new(MockLlm::new("gpt").with_failure("rate limited")));
    let index = refine.process_file("notes.txt", TWO_TOPICS.as_bytes().to_vec()).await.unwrap();
    let err = refine.generate(&index, &request(), &schema).await.unwrap_err();
    assert!(matches!(err, GeneratorError::Generation { step: GenerationStep::Refine, .. }));
}

#[tokio::test]
async fn invalid_requests_never_reach_the_model() {
    let llm = Arc::new(MockLlm::new("gemini").with_response(QUIZ_JSON));
    let quiz_generator = generator(config("google"), llm.clone());
    let index = quiz_generator.process_file("notes.txt", TWO_TOPICS.as_bytes().to_vec()).await.unwrap();
    let schema = ResponseSchema::builtin().unwrap();

    for bad in [QuizRequest::new(0, "Biology", Difficulty::Easy), QuizRequest::new(3, " ", Difficulty::Hard)] {
        let err = quiz_generator.generate(&index, &bad, &schema).await.unwrap_err();
        assert!(matches!(err, GeneratorError::InvalidRequest(_)));
    }
    assert_eq!(llm.call_count(), 0);
}

#[tokio::test]
async fn process_file_rejects_bad_uploads() {
    let quiz_generator = generator(config("google"), Arc::new(MockLlm::new("gemini")));

    let err = quiz_generator.process_file("essay.docx", b"PK".to_vec()).await.unwrap_err();
    assert!(matches!(err, GeneratorError::UnsupportedFileType { .. }));

    let err = quiz_generator.process_file("blank.txt", b"   \n\n  ".to_vec()).await.unwrap_err();
    assert!(matches!(err, GeneratorError::Ingestion { ref file, .. } if file == "blank.txt"));
}

#[tokio::test]
async fn embedding_failure_is_a_retrieval_error() {
    let quiz_generator = QuizGenerator::with_components(
        config("google"),
        Arc::new(MockLlm::new("gemini")),
        Arc::new(FailingEmbedder),
    );

    let err = quiz_generator.process_file("notes.txt", TWO_TOPICS.as_bytes().to_vec()).await.unwrap_err();
    assert!(matches!(err, GeneratorError::Generation { step: GenerationStep::Retrieval, .. }));
}

#[tokio::test]
async fn rejected_uploads_are_logged_at_the_boundary() {
    let capture = EventCapture::new();
    let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(capture.layer()));
    let quiz_generator = generator(config("google"), Arc::new(MockLlm::new("gemini")));

    quiz_generator.process_file("essay.docx", b"PK".to_vec()).await.unwrap_err();

    let errors = capture.at_level(Level::ERROR);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field_str("file"), Some("essay.docx"));
    assert!(errors[0].message.contains("unsupported file type"));
}

#[tokio::test]
async fn custom_templates_replace_the_builtin_prompts() {
    let templates = PromptTemplates {
        creation: PromptTemplate::new("{number} {difficulty} questions on {subject}: {text}"),
        evaluation: PromptTemplate::new("review {quiz} for {subject}"),
    };

    let llm = Arc::new(MockLlm::new("gemini").with_response(QUIZ_JSON));
    let config = GeneratorConfig::builder()
        .model("google")
        .chunk_size(60)
        .chunk_overlap(0)
        .top_k(1)
        .build()
        .unwrap();
    let quiz_generator = generator(config, llm.clone()).with_templates(templates.clone());
    let index = quiz_generator.process_file("notes.txt", TWO_TOPICS.as_bytes().to_vec()).await.unwrap();
    quiz_generator
        .generate(&index, &request().with_query("volcanoes magma mantle"), &ResponseSchema::builtin().unwrap())
        .await
        .unwrap();
    assert_eq!(llm.requests()[0].prompt, "5 Medium questions on Biology: Volcanoes erupt magma from the mantle.");

    let llm = Arc::new(MockLlm::new("gpt-4").with_response("first draft").with_response(QUIZ_JSON));
    let config = GeneratorConfig::builder().model("gpt-4").refine_passes(1).build().unwrap();
    let quiz_generator = generator(config, llm.clone()).with_templates(templates);
    let index = quiz_generator.process_file("notes.txt", TWO_TOPICS.as_bytes().to_vec()).await.unwrap();
    quiz_generator.generate(&index, &request(), &ResponseSchema::builtin().unwrap()).await.unwrap();
    assert_eq!(llm.requests()[1].prompt, "review first draft for Biology");
}

#[tokio::test]
async fn replacement_ingestor_controls_chunking_and_temp_files() {
    let dir = tempfile::tempdir().unwrap();
    let quiz_generator = generator(config("google"), Arc::new(MockLlm::new("gemini")))
        .with_ingestor(DocumentIngestor::default().with_temp_dir(dir.path()));

    let index = quiz_generator.process_file("notes.txt", TWO_TOPICS.as_bytes().to_vec()).await.unwrap();
    assert_eq!(index.len(), 1);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
