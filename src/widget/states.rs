//! Node ids of the chat widget chart.

use crate::state_enum;

state_enum! {
    /// Every node of the chat widget chart, in document order.
    pub enum WidgetState {
        Widget,
        Boot,
        Initializing,
        Failed,
        Active,

        Attachment,
        AttachmentInit,
        AttachmentDisabled,
        AttachmentClosed,
        AttachmentOpen,

        Input,
        InputReady,
        InputTypeMode,
        InputAudioRecordMode,
        InputAudioPlayerMode,
        InputHistory,
        InputBlocked,

        MessageList,
        ListIdle,
        ListPainting,
        PaintBubbles,
        BubblesRendering,
        BubblesRendered,
        PaintScroll,
        ScrollPending,
        ScrollSettled,

        Scroll,
        ScrollIdle,
        Scrolling,

        InputResize,
        InputResizeStop,
        InputResizing,

        AppResize,
        AppResizeStop,
        AppResizing,

        Drag,
        DragIdle,
        DragActive,
        Dragging,
        DragMoving,

        Alert,
        AlertHidden,
        AlertShown,
    }
}

impl WidgetState {
    /// Direct children of the `Active` parallel node.
    pub const REGIONS: &'static [WidgetState] = &[
        Self::Attachment,
        Self::Input,
        Self::MessageList,
        Self::Scroll,
        Self::InputResize,
        Self::AppResize,
        Self::Drag,
        Self::Alert,
    ];
}
