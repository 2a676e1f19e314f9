//! SKILL.md output
//!
//! Persists the model's document locally and into the runtime skills folder.

pub mod skill_writer;

pub use skill_writer::{
    default_skills_dir, resolve_destination, CompiledSkill, SkillMetadata, SkillWriter,
    SKILLS_DIR_ENV,
};
