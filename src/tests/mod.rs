#[cfg(test)]
mod session_tests {
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};

    use anyhow::Result;
    use serde_yaml::Value;
    use tracing::field::{Field, Visit};
    use tracing_subscriber::layer::{Context as LayerContext, Layer};
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::Registry;

    use crate::config::{ConfigSource, Loader, Renderer};
    use crate::engine::{MockDocEngine, ModuleInfo};
    use crate::error::ConfigError;
    use crate::session::{Overrides, RenderSession};

    fn inline(yaml: &str) -> ConfigSource {
        ConfigSource::Inline(serde_yaml::from_str::<Value>(yaml).unwrap())
    }

    const BASE: &str = r#"
loaders:
  - type: python
    search_path: [lib]
    modules: [base.module]
    packages: [base]
renderer:
  type: markdown
  render_toc: false
"#;

    #[test]
    fn test_search_path_only_keeps_modules_and_packages() -> Result<()> {
        let session = RenderSession::new(
            Some(inline(BASE)),
            Overrides {
                search_path: Some(vec!["src/".to_string()]),
                ..Default::default()
            },
        );

        let loaded = session.load()?;
        let python = loaded.config.python_loader().unwrap();
        assert_eq!(python.search_path, Some(vec!["src/".to_string()]));
        assert_eq!(python.modules, Some(vec!["base.module".to_string()]));
        assert_eq!(python.packages, Some(vec!["base".to_string()]));
        assert_eq!(python.parser.print_function, None);
        Ok(())
    }

    #[test]
    fn test_empty_override_replaces_value() -> Result<()> {
        let session = RenderSession::new(
            Some(inline(BASE)),
            Overrides {
                packages: Some(Vec::new()),
                ..Default::default()
            },
        );

        let loaded = session.load()?;
        assert_eq!(loaded.config.python_loader().unwrap().packages, Some(Vec::new()));
        Ok(())
    }

    #[test]
    fn test_py2_negates_print_function() -> Result<()> {
        for (py2, expected) in [(true, false), (false, true)] {
            let session = RenderSession::new(
                Some(inline(BASE)),
                Overrides {
                    py2: Some(py2),
                    ..Default::default()
                },
            );
            let loaded = session.load()?;
            assert_eq!(
                loaded.config.python_loader().unwrap().parser.print_function,
                Some(expected)
            );
        }
        Ok(())
    }

    #[test]
    fn test_overrides_target_first_python_loader() -> Result<()> {
        let yaml = r#"
loaders:
  - type: custom
    root: elsewhere
  - type: python
  - type: python
    modules: [second]
"#;
        let session = RenderSession::new(
            Some(inline(yaml)),
            Overrides {
                modules: Some(vec!["pkg.a".to_string()]),
                ..Default::default()
            },
        );

        let loaded = session.load()?;
        let loaders = &loaded.config.loaders;
        assert!(matches!(&loaders[0], Loader::Other { kind, .. } if kind == "custom"));
        assert!(matches!(
            &loaders[1],
            Loader::Python(p) if p.modules == Some(vec!["pkg.a".to_string()])
        ));
        assert!(matches!(
            &loaders[2],
            Loader::Python(p) if p.modules == Some(vec!["second".to_string()])
        ));
        Ok(())
    }

    #[test]
    fn test_missing_python_loader_renders_nothing() {
        let session = RenderSession::new(
            Some(inline("loaders:\n  - type: custom\n")),
            Overrides {
                modules: Some(vec!["pkg.a".to_string()]),
                ..Default::default()
            },
        );

        // No expectations: any engine call would panic.
        let engine = MockDocEngine::new();
        let result = session.load().and_then(|loaded| session.render(&engine, &loaded));

        let err = result.unwrap_err();
        assert!(matches!(err.downcast_ref::<ConfigError>(), Some(ConfigError::NoPythonLoader)));
        assert_eq!(err.to_string(), "no python loader found");
    }

    #[test]
    fn test_missing_python_loader_is_fine_without_loader_overrides() -> Result<()> {
        let session = RenderSession::new(
            Some(inline("loaders: []\n")),
            Overrides {
                render_toc: Some(true),
                ..Default::default()
            },
        );

        let loaded = session.load()?;
        assert!(loaded.config.loaders.is_empty());
        assert!(matches!(
            &loaded.config.renderer,
            Renderer::Markdown(m) if m.render_toc == Some(true)
        ));
        Ok(())
    }

    #[test]
    fn test_render_toc_ignored_for_other_renderers() -> Result<()> {
        let session = RenderSession::new(
            Some(inline("renderer:\n  type: mkdocs\n")),
            Overrides {
                render_toc: Some(true),
                ..Default::default()
            },
        );

        let loaded = session.load()?;
        match &loaded.config.renderer {
            Renderer::Other { kind, options } => {
                assert_eq!(kind, "mkdocs");
                assert!(options.get("render_toc").is_none());
            }
            other => panic!("unexpected renderer {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_no_source_uses_default_loader() -> Result<()> {
        let session = RenderSession::new(
            None,
            Overrides {
                modules: Some(vec!["pkg.a".to_string()]),
                ..Default::default()
            },
        );

        let loaded = session.load()?;
        assert!(loaded.context.is_none());
        assert_eq!(
            loaded.config.python_loader().unwrap().modules,
            Some(vec!["pkg.a".to_string()])
        );
        Ok(())
    }

    #[test]
    fn test_file_source_sets_context_directory() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("pydoc-markdown.yml");
        fs::write(&path, BASE)?;

        let session = RenderSession::new(Some(ConfigSource::File(path)), Overrides::default());
        let loaded = session.load()?;

        assert_eq!(loaded.context.unwrap().directory, dir.path());
        Ok(())
    }

    #[test]
    fn test_render_runs_engine_in_order_and_returns_watch_set() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config_path = dir.path().join("pydoc-markdown.yml");
        fs::write(&config_path, BASE)?;

        let session = RenderSession::new(
            Some(ConfigSource::File(config_path.clone())),
            Overrides::default(),
        );
        let loaded = session.load()?;

        let mut engine = MockDocEngine::new();
        let mut seq = mockall::Sequence::new();
        let expected_dir = dir.path().to_path_buf();
        engine
            .expect_load_modules()
            .times(1)
            .in_sequence(&mut seq)
            .withf(move |_, context| {
                context.map(|c| c.directory.clone()) == Some(expected_dir.clone())
            })
            .returning(|_, _| {
                Ok(vec![
                    ModuleInfo {
                        name: "pkg.b".to_string(),
                        filename: Some(PathBuf::from("/src/pkg/b.py")),
                    },
                    ModuleInfo {
                        name: "pkg.a".to_string(),
                        filename: Some(PathBuf::from("/src/pkg/a.py")),
                    },
                    ModuleInfo {
                        name: "pkg.a.again".to_string(),
                        filename: Some(PathBuf::from("/src/pkg/a.py")),
                    },
                    ModuleInfo {
                        name: "pkg.generated".to_string(),
                        filename: None,
                    },
                ])
            });
        engine
            .expect_process()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, modules| {
                modules.retain(|m| m.name != "pkg.generated");
                Ok(())
            });
        engine
            .expect_render()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|_, _, modules| modules.len() == 3)
            .returning(|_, _, _| Ok(()));

        let watch = session.render(&engine, &loaded)?;

        let mut expected = vec![
            PathBuf::from("/src/pkg/a.py"),
            PathBuf::from("/src/pkg/b.py"),
            config_path,
        ];
        expected.sort();
        assert_eq!(watch, expected);
        Ok(())
    }

    #[test]
    fn test_inline_source_not_in_watch_set() -> Result<()> {
        let session = RenderSession::new(Some(inline(BASE)), Overrides::default());
        let loaded = session.load()?;

        let mut engine = MockDocEngine::new();
        engine.expect_load_modules().returning(|_, context| {
            assert!(context.is_none());
            Ok(vec![ModuleInfo {
                name: "base.module".to_string(),
                filename: Some(PathBuf::from("lib/base/module.py")),
            }])
        });
        engine.expect_process().returning(|_, _, _| Ok(()));
        engine.expect_render().returning(|_, _, _| Ok(()));

        let watch = session.render(&engine, &loaded)?;
        assert_eq!(watch, vec![Path::new("lib/base/module.py").to_path_buf()]);
        Ok(())
    }

    #[test]
    fn test_engine_error_propagates() -> Result<()> {
        let session = RenderSession::new(Some(inline(BASE)), Overrides::default());
        let loaded = session.load()?;

        let mut engine = MockDocEngine::new();
        engine
            .expect_load_modules()
            .returning(|_, _| Err(anyhow::anyhow!("module not found: base.module")));

        let err = session.render(&engine, &loaded).unwrap_err();
        assert!(err.to_string().contains("module not found"));
        Ok(())
    }

    /// Collects warning messages emitted while the layer is installed.
    struct WarningCollector {
        messages: Arc<Mutex<Vec<String>>>,
    }

    struct MessageVisitor<'a>(&'a mut String);

    impl Visit for MessageVisitor<'_> {
        fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
            if field.name() == "message" {
                self.0.push_str(&format!("{:?}", value));
            }
        }
    }

    impl<S: tracing::Subscriber> Layer<S> for WarningCollector {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: LayerContext<'_, S>) {
            if *event.metadata().level() == tracing::Level::WARN {
                let mut message = String::new();
                event.record(&mut MessageVisitor(&mut message));
                self.messages.lock().unwrap().push(message);
            }
        }
    }

    #[test]
    fn test_unknown_fields_warn_but_load() -> Result<()> {
        let messages = Arc::new(Mutex::new(Vec::new()));
        let subscriber = Registry::default().with(WarningCollector {
            messages: messages.clone(),
        });

        let session = RenderSession::new(
            Some(inline("renderer: {type: markdown}\nrendrer: {}\nhook: []\n")),
            Overrides::default(),
        );
        let loaded = tracing::subscriber::with_default(subscriber, || session.load())?;

        assert_eq!(loaded.config.unknown_fields, vec!["$.rendrer", "$.hook"]);
        let messages = messages.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("Unknown configuration options"));
        assert!(messages[0].contains("$.rendrer\n------\n$.hook"));
        Ok(())
    }
}
