//! Built-in checklists embedded in the binary

use crate::parser::{parse_checklist_content, ChecklistFile};
use anyhow::{Context, Result};

/// An embedded checklist
pub struct Suite {
    pub name: &'static str,
    pub summary: &'static str,
    source: &'static str,
}

impl Suite {
    pub fn source(&self) -> &'static str {
        self.source
    }

    pub fn load(&self) -> Result<ChecklistFile> {
        let mut file = parse_checklist_content(self.source)
            .with_context(|| format!("Built-in suite '{}' is invalid", self.name))?;
        file.name.get_or_insert_with(|| self.name.to_string());
        Ok(file)
    }
}

const SUITES: &[Suite] = &[
    Suite {
        name: "features",
        summary: "actor, profile, review, chat room and message records",
        source: include_str!("features.yaml"),
    },
    Suite {
        name: "storage",
        summary: "blob upload, download URL and cleanup",
        source: include_str!("storage.yaml"),
    },
    Suite {
        name: "harness",
        summary: "sign up/out/in, record CRUD, profile and reviews",
        source: include_str!("harness.yaml"),
    },
    Suite {
        name: "project",
        summary: "config keys, rules, indexes and source files of a project directory",
        source: include_str!("project.yaml"),
    },
];

pub fn list() -> &'static [Suite] {
    SUITES
}

pub fn get(name: &str) -> Result<&'static Suite> {
    SUITES.iter().find(|s| s.name == name).with_context(|| {
        let names: Vec<_> = SUITES.iter().map(|s| s.name).collect();
        format!("Unknown suite: {} (available: {})", name, names.join(", "))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Backend, MemoryBackend};
    use crate::runner::executor::ChecklistRunner;
    use crate::runner::state::Report;
    use crate::utils::config::RunnerConfig;
    use std::path::Path;
    use std::sync::Arc;

    async fn run_suite(name: &str, base_dir: &Path) -> (Report, Arc<MemoryBackend>) {
        let file = get(name).unwrap().load().unwrap();
        let backend = Arc::new(MemoryBackend::new());
        let report = ChecklistRunner::new(backend.clone(), RunnerConfig::default())
            .with_base_dir(base_dir)
            .with_env(file.env.clone())
            .run(&file.to_checks())
            .await
            .unwrap();
        (report, backend)
    }

    #[test]
    fn test_every_suite_parses() {
        for suite in list() {
            let file = suite.load().unwrap();
            assert_eq!(file.name.as_deref(), Some(suite.name));
            assert!(!file.checks.is_empty(), "{} has no checks", suite.name);
            assert!(
                file.checks.iter().all(|c| c.step.is_some()),
                "{} has a check without a step",
                suite.name
            );
        }
    }

    #[test]
    fn test_unknown_suite() {
        let err = get("nope").err().unwrap();
        assert!(err.to_string().contains("available: features, storage, harness, project"));
    }

    #[tokio::test]
    async fn test_features_suite_passes() {
        let (report, backend) = run_suite("features", Path::new(".")).await;
        assert!(report.all_passed(), "{}", report.summarize());
        assert_eq!(report.outcomes().len(), 8);
        assert_eq!(backend.record_count("reviews").await, 1);
        assert_eq!(backend.record_count("chatRooms").await, 1);
    }

    #[tokio::test]
    async fn test_storage_suite_cleans_up() {
        let (report, backend) = run_suite("storage", Path::new(".")).await;
        assert!(report.all_passed(), "{}", report.summarize());

        let url = &report.outcome("get review file url").unwrap().detail;
        assert!(url.starts_with("memory://"));
        let actor = backend.current_actor().await.unwrap();
        assert!(!backend.blob_exists(&format!("users/{}/profile.txt", actor.id)).await);
    }

    #[tokio::test]
    async fn test_harness_suite_passes() {
        let (report, backend) = run_suite("harness", Path::new(".")).await;
        assert!(report.all_passed(), "{}", report.summarize());
        assert_eq!(backend.record_count("test").await, 0);
        assert_eq!(backend.record_count("users").await, 1);
        assert_eq!(backend.record_count("reviews").await, 1);
        assert!(backend.current_actor().await.is_none());

        let review = &report.outcome("read updated review").unwrap().detail;
        assert!(review.contains("\"title\":\"Updated Harness Review\""));
        assert!(review.contains("\"rating\":5"));
    }

    fn write(root: &Path, path: &str, content: &str) {
        let full = root.join(path);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(full, content).unwrap();
    }

    #[tokio::test]
    async fn test_project_suite_against_fixture() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        let keys = [
            "API_KEY",
            "AUTH_DOMAIN",
            "PROJECT_ID",
            "STORAGE_BUCKET",
            "MESSAGING_SENDER_ID",
            "APP_ID",
        ];
        let env: String = keys
            .iter()
            .map(|k| format!("EXPO_PUBLIC_FIREBASE_{}=x\n", k))
            .collect();
        write(root, ".env", &env);
        write(
            root,
            "firestore.rules",
            "match /users/{userId} {}\nmatch /reviews/{reviewId} {}\n\
             match /chatRooms/{roomId} { match /messages/{messageId} {} }\n",
        );
        write(
            root,
            "firestore.indexes.json",
            r#"{"indexes": [{"collectionGroup": "reviews"}, {"collectionGroup": "chatRooms"},
                {"collectionGroup": "messages"}, {"collectionGroup": "users"}]}"#,
        );
        for file in [
            "src/config/firebase.ts",
            "src/state/authStore.ts",
            "src/state/chatStore.ts",
            "src/state/reviewsStore.ts",
            "src/screens/SignInScreen.tsx",
            "src/screens/SignUpScreen.tsx",
            "src/screens/CreateReviewScreen.tsx",
            "src/screens/ChatRoomScreen.tsx",
        ] {
            write(root, file, "export {};\n");
        }
        write(
            root,
            "src/services/firebase.ts",
            "export const firebaseAuth = {};\nexport const firebaseUsers = {};\n\
             export const firebaseReviews = {};\nexport const firebaseChat = {};\n",
        );
        write(
            root,
            "package.json",
            r#"{"dependencies": {"@react-native-firebase/app": "1", "@react-native-firebase/auth": "1",
                "@react-native-firebase/firestore": "1", "@react-native-firebase/storage": "1", "firebase": "10"}}"#,
        );

        let (report, _) = run_suite("project", root).await;
        assert!(report.all_passed(), "{}", report.summarize());

        std::fs::remove_file(root.join("src/state/chatStore.ts")).unwrap();
        let (report, _) = run_suite("project", root).await;
        assert_eq!(report.failed_count(), 1);
        assert_eq!(
            report.outcome("app structure").unwrap().detail,
            "missing: src/state/chatStore.ts"
        );
    }
}
