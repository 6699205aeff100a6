    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;

    #[derive(Default)]
    struct FakeProvider {
        existing: HashSet<u32>,
        fail: bool,
        provisioned: Mutex<Vec<(u32, VirtualScreen)>>,
    }

    #[async_trait]
    impl DisplayProvider for FakeProvider {
        async fn exists(&self, index: u32) -> bool {
            self.existing.contains(&index)
        }

        async fn provision(&self, index: u32, screen: &VirtualScreen) -> Result<u32, ProtocolError> {
            if self.fail {
                return Err(ProtocolError::Display("no Xvfb".to_string()));
            }
            self.provisioned.lock().push((index, *screen));
            Ok(index)
        }
    }

    #[tokio::test]
    async fn test_existing_display_is_used() {
        let provider = FakeProvider {
            existing: [0].into_iter().collect(),
            ..Default::default()
        };
        let index = resolve_display(&provider, 0, None).await.unwrap();
        assert_eq!(index, 0);
    }

    #[tokio::test]
    async fn test_display_zero_is_never_provisioned() {
        let provider = FakeProvider::default();
        let err = resolve_display(&provider, 0, Some(&VirtualScreen::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, DisplayError::RefuseDefault));
        assert!(provider.provisioned.lock().is_empty());
    }

    #[tokio::test]
    async fn test_missing_display_without_screen() {
        let provider = FakeProvider::default();
        let err = resolve_display(&provider, 42, None).await.unwrap_err();
        assert!(matches!(err, DisplayError::Unavailable(42)));
    }

    #[tokio::test]
    async fn test_missing_display_is_provisioned() {
        let provider = FakeProvider::default();
        let screen = VirtualScreen {
            width: 800,
            height: 600,
            depth: 24,
        };
        let index = resolve_display(&provider, 42, Some(&screen)).await.unwrap();
        assert_eq!(index, 42);
        assert_eq!(provider.provisioned.lock().as_slice(), &[(42, screen)]);
    }

    #[tokio::test]
    async fn test_provision_failure() {
        let provider = FakeProvider {
            fail: true,
            ..Default::default()
        };
        let err = resolve_display(&provider, 7, Some(&VirtualScreen::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, DisplayError::ProvisionFailed { index: 7, .. }));
    }

    #[tokio::test]
    async fn test_xvfb_exists_checks_lock_file() {
        let dir = TempDir::new().unwrap();
        let provider = XvfbProvider::default().with_lock_dir(dir.path());

        assert!(!provider.exists(99).await);
        std::fs::write(dir.path().join(".X99-lock"), "12345").unwrap();
        assert!(provider.exists(99).await);
        assert_eq!(provider.lock_file(99), dir.path().join(".X99-lock"));
    }

    #[tokio::test]
    async fn test_xvfb_missing_program() {
        let dir = TempDir::new().unwrap();
        let provider = XvfbProvider::new("/nonexistent/viewpump/Xvfb").with_lock_dir(dir.path());

        let err = provider
            .provision(99, &VirtualScreen::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ProtocolError::Display(_)));
        assert_eq!(provider.running(), 0);
    }
