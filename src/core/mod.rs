pub mod speech;

pub use speech::{
    AudioSource, DEFAULT_POLLING_INTERVAL, RecognitionConfig, RecognizeRequest,
    RecognizeResponse, RestClient, ResultId, ResultStatus, SpeechError, SpeechResult, Utterance,
};
