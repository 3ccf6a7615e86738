//! Voiceover generation pipeline.
//!
//! This module provides the engine that coordinates between the voice
//! manager, the text segmenter and the model backend: resolve the voice,
//! segment the text, synthesize each segment, stitch, post-process, write.

mod tts;

pub use tts::{
    BatchFailure, BatchReport, GenerationRequest, GenerationResult, SPEED_RANGE, VoiceoverEngine,
    VoiceoverError, validate_voice_sample,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio;
    use crate::backend::{BackendError, HealthResponse, MockBackend};
    use crate::cli::Language;
    use crate::config::{Config, OutputFormat, VoiceEntry};
    use crate::voice::{VoiceManager, VoiceMetadata};
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// A short mono WAV like the model server returns.
    fn model_wav(secs: f32, rate: u32) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            let n = (secs * rate as f32) as usize;
            for i in 0..n {
                let t = i as f32 / rate as f32;
                let s = 0.3 * (2.0 * std::f32::consts::PI * 180.0 * t).sin();
                writer.write_sample((s * i16::MAX as f32) as i16).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    /// Temp workspace with a reference voice "narrator" and config pointing
    /// into it.
    struct Workspace {
        dir: TempDir,
        config: Config,
    }

    impl Workspace {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let voices = dir.path().join("voices");
            std::fs::create_dir_all(&voices).unwrap();
            std::fs::write(voices.join("narrator.wav"), model_wav(8.0, 8_000)).unwrap();

            let mut config = Config::default();
            config.voices_dir = voices;
            config.output.directory = dir.path().join("output");

            Self { dir, config }
        }

        fn path(&self, rel: &str) -> PathBuf {
            self.dir.path().join(rel)
        }

        fn engine(&self, backend: MockBackend) -> VoiceoverEngine<MockBackend> {
            let voices = VoiceManager::new(&self.config);
            VoiceoverEngine::new(backend, voices, self.config.clone())
        }
    }

    fn backend_returning_audio(times: usize) -> MockBackend {
        let wav = model_wav(0.5, 24_000);
        let mut mock = MockBackend::new();
        mock.expect_synthesize()
            .times(times)
            .returning(move |_| Ok(wav.clone()));
        mock
    }

    fn output_files(dir: &Path) -> Vec<PathBuf> {
        if !dir.exists() {
            return Vec::new();
        }
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        files.sort();
        files
    }

    // ===========================================
    // Single generation
    // ===========================================

    #[test]
    fn test_generate_every_language_writes_one_file() {
        let ws = Workspace::new();
        let engine = ws.engine(backend_returning_audio(Language::ALL.len()));

        for lang in Language::ALL {
            let output = ws.path(&format!("output/{}.wav", lang.as_str()));
            let request = GenerationRequest::new("Hello there.", "narrator")
                .with_language(Some(lang))
                .with_output(Some(output.clone()));

            let result = engine.generate(&request).unwrap();

            assert_eq!(result.path, output);
            assert!(result.duration_secs > 0.0);
            let info = audio::probe_wav(&output).unwrap();
            assert!(info.duration_secs > 0.0);
        }

        assert_eq!(output_files(&ws.path("output")).len(), Language::ALL.len());
    }

    #[test]
    fn test_generate_unknown_voice_writes_nothing() {
        let ws = Workspace::new();
        let engine = ws.engine(MockBackend::new());

        let request = GenerationRequest::new("Hello", "nobody");
        let result = engine.generate(&request);

        assert!(matches!(result, Err(VoiceoverError::UnknownVoice(_))));
        assert!(output_files(&ws.path("output")).is_empty());
    }

    #[test]
    fn test_generate_empty_text() {
        let ws = Workspace::new();
        let engine = ws.engine(MockBackend::new());

        let result = engine.generate(&GenerationRequest::new("  \n ", "narrator"));
        assert!(matches!(result, Err(VoiceoverError::EmptyText)));
    }

    #[test]
    fn test_generate_matches_configured_output_format() {
        let mut ws = Workspace::new();
        ws.config.output.sample_rate = 48_000;
        ws.config.output.channels = 2;
        let engine = ws.engine(backend_returning_audio(1));

        let output = ws.path("output/stereo.wav");
        let request =
            GenerationRequest::new("Format check.", "narrator").with_output(Some(output.clone()));
        let result = engine.generate(&request).unwrap();

        let info = audio::probe_wav(&output).unwrap();
        assert_eq!(info.sample_rate, 48_000);
        assert_eq!(info.channels, 2);
        assert_eq!(result.sample_rate, 48_000);
        assert_eq!(result.channels, 2);
        assert!((info.duration_secs - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_generate_segments_long_text() {
        let mut ws = Workspace::new();
        ws.config.model.max_segment_chars = 20;
        ws.config.output.segment_gap_ms = 100;
        let engine = ws.engine(backend_returning_audio(3));

        let output = ws.path("output/long.wav");
        let request = GenerationRequest::new("First sentence. Second one here. Third.", "narrator")
            .with_output(Some(output.clone()));
        let result = engine.generate(&request).unwrap();

        assert_eq!(result.segments, 3);
        // 3 x 0.5s of speech plus two 100ms gaps
        assert!((result.duration_secs - 1.7).abs() < 0.01);
    }

    #[test]
    fn test_generate_passes_request_parameters() {
        let ws = Workspace::new();
        let wav = model_wav(0.25, 24_000);
        let sample_path = ws.path("voices/narrator.wav");

        let mut mock = MockBackend::new();
        mock.expect_synthesize()
            .withf(move |req| {
                req.text == "Hola."
                    && req.language == Language::Spanish
                    && req.speed == 1.5
                    && req.temperature == 0.2
                    && req.speaker_wav == sample_path
            })
            .times(1)
            .returning(move |_| Ok(wav.clone()));

        let engine = ws.engine(mock);
        let request = GenerationRequest::new("Hola.", "narrator")
            .with_language(Some(Language::Spanish))
            .with_speed(Some(1.5))
            .with_temperature(Some(0.2))
            .with_output(Some(ws.path("output/hola.wav")));

        engine.generate(&request).unwrap();
    }

    #[test]
    fn test_generate_uses_config_defaults() {
        let mut ws = Workspace::new();
        ws.config.model.speed = 0.8;
        ws.config.model.temperature = 0.4;
        let wav = model_wav(0.25, 24_000);

        let mut mock = MockBackend::new();
        mock.expect_synthesize()
            .withf(|req| {
                req.speed == 0.8 && req.temperature == 0.4 && req.language == Language::English
            })
            .times(1)
            .returning(move |_| Ok(wav.clone()));

        let engine = ws.engine(mock);
        let request = GenerationRequest::new("Defaults.", "narrator")
            .with_output(Some(ws.path("output/defaults.wav")));

        engine.generate(&request).unwrap();
    }

    #[test]
    fn test_generate_uses_profile_language() {
        let ws = Workspace::new();
        let metadata = VoiceMetadata {
            name: "narrator".to_string(),
            description: None,
            language: Some("pt".to_string()),
            duration: None,
            sample_rate: None,
            created_at: "2024-01-01T00:00:00Z".to_string(),
        };
        VoiceManager::save_metadata(&ws.path("voices/narrator.wav"), &metadata).unwrap();
        let wav = model_wav(0.25, 24_000);

        let mut mock = MockBackend::new();
        mock.expect_synthesize()
            .withf(|req| req.language == Language::Portuguese)
            .times(1)
            .returning(move |_| Ok(wav.clone()));

        let engine = ws.engine(mock);
        let request =
            GenerationRequest::new("Olá.", "narrator").with_output(Some(ws.path("output/pt.wav")));

        engine.generate(&request).unwrap();
    }

    #[test]
    fn test_generate_unsupported_profile_language() {
        let mut ws = Workspace::new();
        let sample_path = ws.path("voices/narrator.wav");
        ws.config.voices.insert(
            "klingon".to_string(),
            VoiceEntry {
                sample_path,
                description: None,
                language: Some("tlh".to_string()),
            },
        );
        let engine = ws.engine(MockBackend::new());

        let result = engine.generate(&GenerationRequest::new("Qapla'", "klingon"));
        assert!(matches!(
            result,
            Err(VoiceoverError::UnsupportedLanguage(code)) if code == "tlh"
        ));
    }

    #[test]
    fn test_generate_configured_voice_missing_sample() {
        let mut ws = Workspace::new();
        let sample_path = ws.path("voices/gone.wav");
        ws.config.voices.insert(
            "gone".to_string(),
            VoiceEntry {
                sample_path,
                description: None,
                language: None,
            },
        );
        let engine = ws.engine(MockBackend::new());

        let result = engine.generate(&GenerationRequest::new("Hi", "gone"));
        assert!(matches!(result, Err(VoiceoverError::FileNotFound(_))));
    }

    #[test]
    fn test_generate_rejects_out_of_range_parameters() {
        let ws = Workspace::new();
        let engine = ws.engine(MockBackend::new());

        let fast = GenerationRequest::new("Hi", "narrator").with_speed(Some(10.0));
        assert!(matches!(
            engine.generate(&fast),
            Err(VoiceoverError::InvalidParameter(_))
        ));

        let hot = GenerationRequest::new("Hi", "narrator").with_temperature(Some(1.5));
        assert!(matches!(
            engine.generate(&hot),
            Err(VoiceoverError::InvalidParameter(_))
        ));

        let nan = GenerationRequest::new("Hi", "narrator").with_speed(Some(f32::NAN));
        assert!(matches!(
            engine.generate(&nan),
            Err(VoiceoverError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_generate_model_failure_leaves_no_file() {
        let ws = Workspace::new();
        let mut mock = MockBackend::new();
        mock.expect_synthesize()
            .times(1)
            .returning(|_| Err(BackendError::ModelError("CUDA out of memory".to_string())));

        let engine = ws.engine(mock);
        let output = ws.path("output/fail.wav");
        let request =
            GenerationRequest::new("Hello.", "narrator").with_output(Some(output.clone()));

        let result = engine.generate(&request);

        assert!(matches!(result, Err(VoiceoverError::ModelInvocation(_))));
        assert!(output_files(&ws.path("output")).is_empty());
    }

    #[test]
    fn test_generate_rejects_non_wav_model_output() {
        let ws = Workspace::new();
        let mut mock = MockBackend::new();
        mock.expect_synthesize()
            .times(1)
            .returning(|_| Ok(b"RIFF garbage".to_vec()));

        let engine = ws.engine(mock);
        let request = GenerationRequest::new("Hello.", "narrator")
            .with_output(Some(ws.path("output/bad.wav")));

        assert!(matches!(
            engine.generate(&request),
            Err(VoiceoverError::ModelInvocation(BackendError::InvalidResponse(_)))
        ));
    }

    #[test]
    fn test_generate_default_output_paths_increment() {
        let ws = Workspace::new();
        let engine = ws.engine(backend_returning_audio(2));

        let first = engine
            .generate(&GenerationRequest::new("One.", "narrator"))
            .unwrap();
        let second = engine
            .generate(&GenerationRequest::new("Two.", "narrator"))
            .unwrap();

        assert_eq!(first.path, ws.path("output/output_1.wav"));
        assert_eq!(second.path, ws.path("output/output_2.wav"));
    }

    #[test]
    fn test_generate_overwrites_existing_output() {
        let ws = Workspace::new();
        let engine = ws.engine(backend_returning_audio(1));
        let output = ws.path("existing.wav");
        std::fs::write(&output, b"stale").unwrap();

        let request = GenerationRequest::new("Fresh.", "narrator").with_output(Some(output.clone()));
        engine.generate(&request).unwrap();

        assert!(audio::probe_wav(&output).is_ok());
    }

    // ===========================================
    // MP3 output
    // ===========================================

    #[test]
    fn test_generate_mp3_output() {
        let mut ws = Workspace::new();
        ws.config.output.format = OutputFormat::Mp3;
        ws.config.output.sample_rate = 48_000;
        ws.config.output.channels = 2;
        let engine = ws.engine(backend_returning_audio(1));

        let result = engine
            .generate(&GenerationRequest::new("Encode me.", "narrator"))
            .unwrap();

        assert_eq!(result.path, ws.path("output/output_1.mp3"));
        let info = audio::probe_audio(&result.path).unwrap();
        assert_eq!(info.sample_rate, 48_000);
        assert_eq!(info.channels, 2);
        assert!(info.duration_secs > 0.4);
        assert!(audio::probe_wav(&result.path).is_err());
    }

    #[test]
    fn test_generate_explicit_extension_overrides_format() {
        let mut ws = Workspace::new();
        ws.config.output.format = OutputFormat::Mp3;
        let engine = ws.engine(backend_returning_audio(1));

        let output = ws.path("output/keep.wav");
        let request = GenerationRequest::new("Still a wav.", "narrator")
            .with_output(Some(output.clone()));
        engine.generate(&request).unwrap();

        assert_eq!(audio::probe_wav(&output).unwrap().sample_rate, 44_100);
    }

    #[test]
    fn test_batch_mp3_output_names() {
        let mut ws = Workspace::new();
        ws.config.output.format = OutputFormat::Mp3;
        let texts = ws.path("texts");
        write_texts(&texts, &[("intro.txt", "Welcome.")]);
        let engine = ws.engine(backend_returning_audio(1));

        let report = engine
            .generate_batch(&texts, "narrator", None, None, None)
            .unwrap();

        assert_eq!(report.generated[0].path, ws.path("output/intro_voiceover.mp3"));
        let info = audio::probe_audio(&report.generated[0].path).unwrap();
        assert_eq!(info.sample_rate, 44_100);
        assert_eq!(info.channels, 1);
    }

    // ===========================================
    // Batch generation
    // ===========================================

    fn write_texts(dir: &Path, files: &[(&str, &str)]) {
        std::fs::create_dir_all(dir).unwrap();
        for (name, contents) in files {
            std::fs::write(dir.join(name), contents).unwrap();
        }
    }

    #[test]
    fn test_batch_generates_one_file_per_text() {
        let ws = Workspace::new();
        let texts = ws.path("texts");
        write_texts(
            &texts,
            &[
                ("intro.txt", "Welcome."),
                ("middle.txt", "The middle part."),
                ("outro.txt", "Goodbye."),
                ("notes.md", "Not a script."),
            ],
        );
        let engine = ws.engine(backend_returning_audio(3));

        let report = engine
            .generate_batch(&texts, "narrator", None, None, None)
            .unwrap();

        assert!(report.is_success());
        assert_eq!(report.generated.len(), 3);
        assert_eq!(
            output_files(&ws.path("output")),
            vec![
                ws.path("output/intro_voiceover.wav"),
                ws.path("output/middle_voiceover.wav"),
                ws.path("output/outro_voiceover.wav"),
            ]
        );
    }

    #[test]
    fn test_batch_skips_empty_files() {
        let ws = Workspace::new();
        let texts = ws.path("texts");
        write_texts(&texts, &[("a.txt", "Words."), ("blank.txt", "  \n")]);
        let engine = ws.engine(backend_returning_audio(1));

        let report = engine
            .generate_batch(&texts, "narrator", None, None, None)
            .unwrap();

        assert_eq!(report.generated.len(), 1);
        assert_eq!(report.skipped, vec![texts.join("blank.txt")]);
        assert!(report.is_success());
    }

    #[test]
    fn test_batch_continues_after_failure() {
        let ws = Workspace::new();
        let texts = ws.path("texts");
        write_texts(
            &texts,
            &[
                ("one.txt", "First."),
                ("two.txt", "Please fail."),
                ("three.txt", "Third."),
            ],
        );
        let wav = model_wav(0.25, 24_000);

        let mut mock = MockBackend::new();
        mock.expect_synthesize().times(3).returning(move |req| {
            if req.text.contains("fail") {
                Err(BackendError::ModelError("CUDA out of memory".to_string()))
            } else {
                Ok(wav.clone())
            }
        });

        let engine = ws.engine(mock);
        let report = engine
            .generate_batch(&texts, "narrator", None, None, None)
            .unwrap();

        assert!(!report.is_success());
        assert_eq!(report.generated.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].path, texts.join("two.txt"));
        assert!(!ws.path("output/two_voiceover.wav").exists());
    }

    #[test]
    fn test_batch_missing_directory() {
        let ws = Workspace::new();
        let engine = ws.engine(MockBackend::new());

        let result = engine.generate_batch(&ws.path("nope"), "narrator", None, None, None);
        assert!(matches!(result, Err(VoiceoverError::FileNotFound(_))));
    }

    #[test]
    fn test_batch_unknown_voice_aborts() {
        let ws = Workspace::new();
        let texts = ws.path("texts");
        write_texts(&texts, &[("a.txt", "Words.")]);
        let engine = ws.engine(MockBackend::new());

        let result = engine.generate_batch(&texts, "nobody", None, None, None);
        assert!(matches!(result, Err(VoiceoverError::UnknownVoice(_))));
    }

    #[test]
    fn test_batch_empty_directory() {
        let ws = Workspace::new();
        let texts = ws.path("texts");
        std::fs::create_dir_all(&texts).unwrap();
        let engine = ws.engine(MockBackend::new());

        let report = engine
            .generate_batch(&texts, "narrator", None, None, None)
            .unwrap();
        assert_eq!(report, BatchReport::default());
    }

    // ===========================================
    // Health and voices
    // ===========================================

    #[test]
    fn test_health_check_success() {
        let ws = Workspace::new();
        let mut mock = MockBackend::new();
        mock.expect_health().times(1).returning(|| {
            Ok(HealthResponse {
                status: "healthy".to_string(),
                model: "tts_models/multilingual/multi-dataset/xtts_v2".to_string(),
                cuda_available: false,
                device: "cpu".to_string(),
            })
        });

        let health = ws.engine(mock).health_check().unwrap();
        assert_eq!(health.device, "cpu");
    }

    #[test]
    fn test_health_check_not_ready() {
        let ws = Workspace::new();
        let mut mock = MockBackend::new();
        mock.expect_health().times(1).returning(|| {
            Ok(HealthResponse {
                status: "loading".to_string(),
                model: "xtts_v2".to_string(),
                cuda_available: true,
                device: "cuda:0".to_string(),
            })
        });

        let result = ws.engine(mock).health_check();
        assert!(matches!(result, Err(VoiceoverError::ModelInvocation(_))));
    }

    #[test]
    fn test_health_check_connection_refused() {
        let ws = Workspace::new();
        let mut mock = MockBackend::new();
        mock.expect_health().times(1).returning(|| {
            Err(BackendError::ConnectionFailed(
                "Connection refused".to_string(),
            ))
        });

        assert!(ws.engine(mock).health_check().is_err());
    }

    #[test]
    fn test_preflight_reports_unknown_voice_before_server() {
        let ws = Workspace::new();
        let mut mock = MockBackend::new();
        mock.expect_health().times(0);

        let result = ws.engine(mock).preflight("nobody");
        assert!(matches!(result, Err(VoiceoverError::UnknownVoice(name)) if name == "nobody"));
    }

    #[test]
    fn test_preflight_server_down_with_known_voice() {
        let ws = Workspace::new();
        let mut mock = MockBackend::new();
        mock.expect_health().times(1).returning(|| {
            Err(BackendError::ConnectionFailed(
                "Connection refused".to_string(),
            ))
        });

        let result = ws.engine(mock).preflight("narrator");
        assert!(matches!(result, Err(VoiceoverError::ModelInvocation(_))));
    }

    #[test]
    fn test_preflight_success() {
        let ws = Workspace::new();
        let mut mock = MockBackend::new();
        mock.expect_health().times(1).returning(|| {
            Ok(HealthResponse {
                status: "healthy".to_string(),
                model: "tts_models/multilingual/multi-dataset/xtts_v2".to_string(),
                cuda_available: true,
                device: "cuda:0".to_string(),
            })
        });

        let (profile, health) = ws.engine(mock).preflight("narrator").unwrap();
        assert_eq!(profile.name, "narrator");
        assert!(health.cuda_available);
    }

    #[test]
    fn test_list_voices() {
        let ws = Workspace::new();
        let voices = ws.engine(MockBackend::new()).list_voices().unwrap();

        assert_eq!(voices.len(), 1);
        assert_eq!(voices[0].name, "narrator");
    }

    #[test]
    fn test_validate_voice_sample_duration() {
        let ws = Workspace::new();
        let duration = validate_voice_sample(&ws.path("voices/narrator.wav")).unwrap();
        assert!((duration - 8.0).abs() < 0.01);

        let missing = validate_voice_sample(&ws.path("voices/missing.wav"));
        assert!(matches!(missing, Err(VoiceoverError::FileNotFound(_))));
    }
}
