//! Permission catalog
//!
//! Every slug the platform checks is listed here. New slugs default to `false`
//! everywhere until a role assigns them. Groups only drive how slugs are
//! presented and whether board-scoped roles may carry them.

use serde::{Deserialize, Serialize};

pub const BOARD_CONFIG: &str = "board.config";
pub const BOARD_POST_CREATE_REPLY: &str = "board.post.create.reply";
pub const BOARD_POST_DELETE_OTHER: &str = "board.post.delete.other";
pub const BOARD_POST_DELETE_SELF: &str = "board.post.delete.self";
pub const BOARD_POST_EDIT_SELF: &str = "board.post.edit.self";
pub const BOARD_POST_LOCK_BYPASS: &str = "board.post.lock_bypass";
pub const BOARD_ATTACHMENT_DELETE_SELF: &str = "board.attachment.delete.self";
pub const BOARD_ATTACHMENT_SPOILER_OTHER: &str = "board.attachment.spoiler.other";
pub const BOARD_ATTACHMENT_SPOILER_SELF: &str = "board.attachment.spoiler.self";
pub const BOARD_USER_UNBAN: &str = "board.user.unban";
pub const SITE_BOARD_VIEW_UNINDEXED: &str = "site.board.view_unindexed";
pub const SYS_BOARDS: &str = "sys.boards";
pub const SYS_CACHE: &str = "sys.cache";
pub const SYS_LOGS: &str = "sys.logs";
pub const SYS_ROLES: &str = "sys.roles";
pub const SYS_PAYMENTS: &str = "sys.payments";
pub const SYS_PERMISSIONS: &str = "sys.permissions";

/// All known permission slugs
pub const PERMISSION_SLUGS: &[&str] = &[
    "board.config",
    "board.bans",
    "board.logs",
    "board.create",
    "board.create.banned",
    "board.delete",
    "board.history",
    "board.reassign",
    "board.reports",
    "board.attachment.upload",
    "board.attachment.delete.self",
    "board.attachment.delete.other",
    "board.attachment.spoiler.upload",
    "board.attachment.spoiler.self",
    "board.attachment.spoiler.other",
    "board.post.create.thread",
    "board.post.create.reply",
    "board.post.delete.self",
    "board.post.delete.other",
    "board.post.edit.self",
    "board.post.edit.other",
    "board.post.sticky",
    "board.post.lock",
    "board.post.bumplock",
    "board.post.suppress",
    "board.post.lock_bypass",
    "board.post.report",
    "board.user.ban.reason",
    "board.user.ban.free",
    "board.user.role",
    "board.user.unban",
    "site.attachment.create",
    "site.attachment.ban",
    "site.board.feature",
    "site.board.view_unindexed",
    "site.board.setting_lock",
    "site.pm",
    "site.post.report",
    "site.profile.edit.other",
    "site.profile.edit.self",
    "site.profile.view",
    "site.user.create",
    "site.user.merge",
    "site.user.raw_ip",
    "site.reports",
    "sys.boards",
    "sys.cache",
    "sys.config",
    "sys.logs",
    "sys.nocaptcha",
    "sys.roles",
    "sys.payments",
    "sys.permissions",
    "sys.tools",
    "sys.users",
];

/// Display group of permission slugs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGroup {
    pub group_name: String,
    pub display_order: i32,
    /// Slugs in this group may only be set on global roles
    pub is_system_only: bool,
    pub is_account_only: bool,
    pub permissions: Vec<String>,
}

impl PermissionGroup {
    fn new(group_name: &str, display_order: i32, permissions: &[&str]) -> Self {
        Self {
            group_name: group_name.to_string(),
            display_order,
            is_system_only: false,
            is_account_only: false,
            permissions: permissions.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    const fn system_only(mut self) -> Self {
        self.is_system_only = true;
        self
    }
}

/// Seeded permission groups, in display order
#[must_use]
pub fn permission_groups() -> Vec<PermissionGroup> {
    vec![
        PermissionGroup::new(
            "board_controls",
            100,
            &["board.config", "board.bans", "board.logs", "board.delete", "board.reassign"],
        ),
        PermissionGroup::new(
            "board_images",
            200,
            &[
                "board.attachment.upload",
                "board.attachment.delete.self",
                "board.attachment.delete.other",
                "board.attachment.spoiler.upload",
                "board.attachment.spoiler.self",
                "board.attachment.spoiler.other",
            ],
        ),
        PermissionGroup::new(
            "board_posts",
            300,
            &[
                "board.post.create.thread",
                "board.post.create.reply",
                "board.post.delete.other",
                "board.post.delete.self",
                "board.post.edit.self",
                "board.post.edit.other",
                "board.post.report",
            ],
        ),
        PermissionGroup::new(
            "board_moderation",
            350,
            &[
                "board.post.sticky",
                "board.post.lock",
                "board.post.bumplock",
                "board.reports",
                "board.history",
            ],
        ),
        PermissionGroup::new(
            "board_users",
            400,
            &[
                "board.user.ban.free",
                "board.user.ban.reason",
                "board.user.role",
                "board.user.unban",
            ],
        ),
        PermissionGroup::new(
            "site_tools",
            500,
            &[
                "board.create",
                "board.create.banned",
                "site.attachment.create",
                "site.attachment.ban",
                "site.board.feature",
                "site.board.view_unindexed",
                "site.pm",
                "site.post.report",
                "site.user.create",
                "site.user.merge",
                "site.user.raw_ip",
                "site.reports",
            ],
        )
        .system_only(),
        PermissionGroup::new(
            "system_tools",
            600,
            &[
                "sys.boards",
                "sys.cache",
                "sys.config",
                "sys.logs",
                "sys.roles",
                "sys.nocaptcha",
                "sys.payments",
                "sys.permissions",
                "sys.tools",
                "sys.users",
            ],
        )
        .system_only(),
    ]
}
