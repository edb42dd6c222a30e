//! DOM effects.

use serde::Deserialize;
use serde_json::Value;

use super::{Effect, UnknownFallback};
use crate::dom::{DomEvent, ListenerId, NodeId, ScrollOptions};
use crate::vnode::EventHandler;

#[derive(Debug, Deserialize)]
#[serde(tag = "operation", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum DomOp {
    Query {
        selector: String,
    },
    QueryAll {
        selector: String,
    },
    GetElementById {
        id: String,
    },
    SetTextContent {
        element: NodeId,
        text: String,
    },
    /// The html is written as escaped text, never parsed as markup.
    #[serde(rename = "setHTML")]
    SetHtml {
        element: NodeId,
        html: String,
    },
    SetAttribute {
        element: NodeId,
        name: String,
        value: String,
    },
    RemoveAttribute {
        element: NodeId,
        name: String,
    },
    AddClass {
        element: NodeId,
        class_name: String,
    },
    RemoveClass {
        element: NodeId,
        class_name: String,
    },
    HasClass {
        element: NodeId,
        class_name: String,
    },
    SetStyle {
        element: NodeId,
        property: String,
        value: String,
    },
    #[serde(skip)]
    AddEventListener {
        element: NodeId,
        event: String,
        handler: EventHandler,
    },
    RemoveEventListener {
        element: NodeId,
        listener: ListenerId,
    },
    CreateElement {
        tag_name: String,
    },
    AppendChild {
        parent: NodeId,
        child: NodeId,
    },
    RemoveChild {
        parent: NodeId,
        child: NodeId,
    },
    Focus {
        element: NodeId,
    },
    ScrollTo {
        element: NodeId,
        #[serde(default)]
        options: ScrollOptions,
    },
    DomReady,
    #[serde(skip)]
    Unknown {
        operation: String,
        payload: Value,
    },
}

impl DomOp {
    pub fn operation(&self) -> &str {
        match self {
            DomOp::Query { .. } => "query",
            DomOp::QueryAll { .. } => "queryAll",
            DomOp::GetElementById { .. } => "getElementById",
            DomOp::SetTextContent { .. } => "setTextContent",
            DomOp::SetHtml { .. } => "setHTML",
            DomOp::SetAttribute { .. } => "setAttribute",
            DomOp::RemoveAttribute { .. } => "removeAttribute",
            DomOp::AddClass { .. } => "addClass",
            DomOp::RemoveClass { .. } => "removeClass",
            DomOp::HasClass { .. } => "hasClass",
            DomOp::SetStyle { .. } => "setStyle",
            DomOp::AddEventListener { .. } => "addEventListener",
            DomOp::RemoveEventListener { .. } => "removeEventListener",
            DomOp::CreateElement { .. } => "createElement",
            DomOp::AppendChild { .. } => "appendChild",
            DomOp::RemoveChild { .. } => "removeChild",
            DomOp::Focus { .. } => "focus",
            DomOp::ScrollTo { .. } => "scrollTo",
            DomOp::DomReady => "domReady",
            DomOp::Unknown { operation, .. } => operation,
        }
    }
}

impl UnknownFallback for DomOp {
    fn unknown(operation: String, payload: Value) -> Self {
        DomOp::Unknown { operation, payload }
    }
}

pub fn query(selector: impl Into<String>) -> Effect {
    Effect::new(DomOp::Query {
        selector: selector.into(),
    })
}

pub fn query_all(selector: impl Into<String>) -> Effect {
    Effect::new(DomOp::QueryAll {
        selector: selector.into(),
    })
}

pub fn get_element_by_id(id: impl Into<String>) -> Effect {
    Effect::new(DomOp::GetElementById { id: id.into() })
}

pub fn set_text_content(element: NodeId, text: impl Into<String>) -> Effect {
    Effect::new(DomOp::SetTextContent {
        element,
        text: text.into(),
    })
}

pub fn set_html(element: NodeId, html: impl Into<String>) -> Effect {
    Effect::new(DomOp::SetHtml {
        element,
        html: html.into(),
    })
}

pub fn set_attribute(element: NodeId, name: impl Into<String>, value: impl Into<String>) -> Effect {
    Effect::new(DomOp::SetAttribute {
        element,
        name: name.into(),
        value: value.into(),
    })
}

pub fn remove_attribute(element: NodeId, name: impl Into<String>) -> Effect {
    Effect::new(DomOp::RemoveAttribute {
        element,
        name: name.into(),
    })
}

pub fn add_class(element: NodeId, class_name: impl Into<String>) -> Effect {
    Effect::new(DomOp::AddClass {
        element,
        class_name: class_name.into(),
    })
}

pub fn remove_class(element: NodeId, class_name: impl Into<String>) -> Effect {
    Effect::new(DomOp::RemoveClass {
        element,
        class_name: class_name.into(),
    })
}

pub fn has_class(element: NodeId, class_name: impl Into<String>) -> Effect {
    Effect::new(DomOp::HasClass {
        element,
        class_name: class_name.into(),
    })
}

pub fn set_style(element: NodeId, property: impl Into<String>, value: impl Into<String>) -> Effect {
    Effect::new(DomOp::SetStyle {
        element,
        property: property.into(),
        value: value.into(),
    })
}

pub fn add_event_listener(
    element: NodeId,
    event: impl Into<String>,
    handler: impl Fn(&DomEvent) + Send + Sync + 'static,
) -> Effect {
    Effect::new(DomOp::AddEventListener {
        element,
        event: event.into(),
        handler: EventHandler::new(handler),
    })
}

pub fn remove_event_listener(element: NodeId, listener: ListenerId) -> Effect {
    Effect::new(DomOp::RemoveEventListener { element, listener })
}

pub fn create_element(tag_name: impl Into<String>) -> Effect {
    Effect::new(DomOp::CreateElement {
        tag_name: tag_name.into(),
    })
}

pub fn append_child(parent: NodeId, child: NodeId) -> Effect {
    Effect::new(DomOp::AppendChild { parent, child })
}

pub fn remove_child(parent: NodeId, child: NodeId) -> Effect {
    Effect::new(DomOp::RemoveChild { parent, child })
}

pub fn focus(element: NodeId) -> Effect {
    Effect::new(DomOp::Focus { element })
}

pub fn scroll_to(element: NodeId, options: ScrollOptions) -> Effect {
    Effect::new(DomOp::ScrollTo { element, options })
}

pub fn dom_ready() -> Effect {
    Effect::new(DomOp::DomReady)
}
