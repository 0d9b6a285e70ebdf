use clipdeck_core::{
    folder::FolderRecord,
    ids::{FolderId, SpaceId, WorkspaceId},
};

/// A broadcast scope derived from a resource's containers. The routing key
/// is picked by specificity — folder over space over workspace — and is a
/// pure function of the ids, so every server instance computes the same key
/// for the same entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomScope {
    pub folder_id: Option<FolderId>,
    pub space_id: Option<SpaceId>,
    pub workspace_id: Option<WorkspaceId>,
}

impl RoomScope {
    pub fn folder(folder_id: impl Into<FolderId>) -> Self {
        Self {
            folder_id: Some(folder_id.into()),
            ..Self::default()
        }
    }

    pub fn space(space_id: impl Into<SpaceId>) -> Self {
        Self {
            space_id: Some(space_id.into()),
            ..Self::default()
        }
    }

    pub fn workspace(workspace_id: impl Into<WorkspaceId>) -> Self {
        Self {
            workspace_id: Some(workspace_id.into()),
            ..Self::default()
        }
    }

    /// The folder's own room: where clients watching this folder live.
    pub fn for_folder(folder: &FolderRecord) -> Self {
        Self::folder(folder.id.clone())
    }

    /// The room of the container a folder sits in — parent folder, then
    /// space, then workspace root. Listing views watch containers, so
    /// child-level changes are announced here.
    pub fn for_folder_container(folder: &FolderRecord) -> Self {
        if let Some(parent_id) = &folder.parent_folder_id {
            Self::folder(parent_id.clone())
        } else if let Some(space_id) = &folder.space_id {
            Self::space(space_id.clone())
        } else {
            Self::workspace(folder.workspace_id.clone())
        }
    }

    pub fn room_id(&self) -> Option<String> {
        if let Some(folder_id) = &self.folder_id {
            Some(format!("folder:{folder_id}"))
        } else if let Some(space_id) = &self.space_id {
            Some(format!("space:{space_id}"))
        } else {
            self.workspace_id
                .as_ref()
                .map(|workspace_id| format!("workspace:{workspace_id}"))
        }
    }
}

/// Per-user room for user-targeted emission; every authenticated connection
/// joins its own.
pub fn user_room(user_id: &str) -> String {
    format!("user:{user_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folder_id_alone_determines_the_room() {
        let bare = RoomScope::folder("f-1");
        let full = RoomScope {
            folder_id: Some(FolderId::from("f-1")),
            space_id: Some(SpaceId::from("s-1")),
            workspace_id: Some(WorkspaceId::from("w-1")),
        };

        assert_eq!(bare.room_id(), full.room_id());
        assert_eq!(bare.room_id().as_deref(), Some("folder:f-1"));
    }

    #[test]
    fn specificity_is_folder_then_space_then_workspace() {
        let space_and_workspace = RoomScope {
            folder_id: None,
            space_id: Some(SpaceId::from("s-1")),
            workspace_id: Some(WorkspaceId::from("w-1")),
        };
        assert_eq!(space_and_workspace.room_id().as_deref(), Some("space:s-1"));

        let workspace_only = RoomScope::workspace("w-1");
        assert_eq!(workspace_only.room_id().as_deref(), Some("workspace:w-1"));

        assert_eq!(RoomScope::default().room_id(), None);
    }

    #[test]
    fn same_scope_always_yields_the_same_key() {
        let a = RoomScope::space("s-9").room_id();
        let b = RoomScope::space("s-9").room_id();
        assert_eq!(a, b);
    }

    #[test]
    fn container_scope_prefers_parent_folder() {
        let folder = FolderRecord {
            id: FolderId::from("f-child"),
            workspace_id: WorkspaceId::from("w-1"),
            space_id: Some(SpaceId::from("s-1")),
            parent_folder_id: Some(FolderId::from("f-parent")),
            name: "child".to_owned(),
            created_at: 0,
        };
        assert_eq!(
            RoomScope::for_folder_container(&folder).room_id().as_deref(),
            Some("folder:f-parent")
        );

        let space_root = FolderRecord {
            parent_folder_id: None,
            ..folder.clone()
        };
        assert_eq!(
            RoomScope::for_folder_container(&space_root)
                .room_id()
                .as_deref(),
            Some("space:s-1")
        );

        let library_root = FolderRecord {
            parent_folder_id: None,
            space_id: None,
            ..folder
        };
        assert_eq!(
            RoomScope::for_folder_container(&library_root)
                .room_id()
                .as_deref(),
            Some("workspace:w-1")
        );
    }

    #[test]
    fn user_rooms_are_namespaced() {
        assert_eq!(user_room("u-1"), "user:u-1");
    }
}
