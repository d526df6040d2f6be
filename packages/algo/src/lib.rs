//! # wordcat-algo - 自适应词汇测评核心算法库
//!
//! Pure Rust algorithms behind the adaptive vocabulary assessment:
//!
//! - **Ability Model** - 1PL (Rasch) response model with Fisher information,
//!   online theta/variance updates and per-category ability
//! - **Selection Engine** - slot-based multi-strategy sampling for fixed
//!   assessments and epsilon-greedy single-item selection for practice
//! - **Spaced Repetition** - time gating of recently answered items
//!
//! ## 设计理念
//!
//! - **No I/O** - storage, catalogs and presentation live in `wordcat-engine`
//! - **Total functions** - numeric clamping instead of error paths
//! - **Injected randomness** - every sampler takes a caller-supplied `Rng`
//!
//! ## 模块结构
//!
//! - [`ability`] - probability, information, updates, aggregates
//! - [`selection`] - assessment and practice selection, weighted sampling
//! - [`config`] - the constants table
//! - [`sanitize`] - numerical stability helpers
//! - [`types`] - catalog and learner data model
//!
//! ## 使用示例
//!
//! ```rust
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//! use wordcat_algo::{AbilityModel, AbilityState, Category, Item};
//! use wordcat_algo::selection::{ProgressMap, SelectionContext, SelectionEngine};
//!
//! let items = vec![Item {
//!     id: "apple".into(),
//!     grade: 1,
//!     word: "apple".into(),
//!     meaning: "a round fruit".into(),
//!     phrase: None,
//!     phrase_meaning: None,
//!     category: Category::Noun,
//!     difficulty: -0.5,
//!     exam_frequency: 3,
//! }];
//!
//! let mut state = AbilityState::new(1, chrono::Utc::now());
//! let model = AbilityModel::default();
//! let delta = model.process_answer(&mut state, &items[0], true, false);
//! assert!(delta > 0.0);
//!
//! let progress = ProgressMap::new();
//! let ctx = SelectionContext {
//!     state: &state,
//!     progress: &progress,
//!     beginner_mode: false,
//!     now: chrono::Utc::now(),
//! };
//! let mut rng = ChaCha8Rng::seed_from_u64(7);
//! let picked = SelectionEngine::default().select_assessment(&items, &ctx, 10, &mut rng);
//! assert_eq!(picked.len(), 1);
//! ```

// ============================================================================
// 模块声明
// ============================================================================

pub mod ability;
pub mod config;
pub mod sanitize;
pub mod selection;
pub mod types;

// ============================================================================
// 重新导出
// ============================================================================

/// 重新导出所有公共类型
pub use types::*;

/// 重新导出能力模型
pub use ability::AbilityModel;

/// 重新导出配置表
pub use config::{AlgoConfig, CategoryWeights, ConfigError};

/// 重新导出选题引擎
pub use selection::{ProgressMap, SelectionContext, SelectionEngine, WeightedPool};
