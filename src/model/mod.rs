//! 模型模块：元素、数据流及其属性集
pub mod attribute;
pub mod element;
pub mod dataflow;
pub mod input;
pub mod sample;

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

pub use self::attribute::AttributeSource;
pub use self::element::{Element, ElementAttributes, ElementKind, Provider};
pub use self::dataflow::{Dataflow, ElementId};
pub use self::input::{ElementInput, FlowInput, ModelInput};

use crate::error::{RsThreatError, RstResult};

/// 默认模型名称
pub const DEFAULT_MODEL_NAME: &str = "Custom System";

/// 规则匹配时实体的动态类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EntityKind {
    Element(ElementKind),
    Dataflow,
}

/// 威胁模型：拥有全部元素和数据流
#[derive(Debug, Clone, Default)]
pub struct ThreatModel {
    name: String,
    elements: Vec<Element>,
    dataflows: Vec<Dataflow>,
    index: HashMap<String, ElementId>,
}

impl ThreatModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 添加元素，名称必须唯一
    pub fn add_element(&mut self, element: Element) -> RstResult<ElementId> {
        if self.index.contains_key(&element.name) {
            return Err(RsThreatError::DuplicateNameError(element.name));
        }
        let id = ElementId(self.elements.len());
        self.index.insert(element.name.clone(), id);
        self.elements.push(element);
        Ok(id)
    }

    /// 添加数据流，两端元素必须已存在
    pub fn add_dataflow(
        &mut self,
        source: &str,
        target: &str,
        label: impl Into<String>,
        protocol: impl Into<String>,
        is_encrypted: bool,
    ) -> RstResult<usize> {
        let resolve = |endpoint: &str| {
            self.index.get(endpoint).copied().ok_or_else(|| RsThreatError::UnknownEndpointError {
                endpoint: endpoint.to_string(),
                source_name: source.to_string(),
                target_name: target.to_string(),
            })
        };
        let source_id = resolve(source)?;
        let target_id = resolve(target)?;

        self.dataflows.push(Dataflow {
            source: source_id,
            target: target_id,
            label: label.into(),
            protocol: protocol.into(),
            is_encrypted,
        });
        Ok(self.dataflows.len() - 1)
    }

    /// 按插入顺序返回元素
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// 按插入顺序返回数据流
    pub fn dataflows(&self) -> &[Dataflow] {
        &self.dataflows
    }

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id.0)
    }

    pub fn find_element(&self, name: &str) -> Option<&Element> {
        self.index.get(name).and_then(|id| self.element(*id))
    }

    /// 数据流的显示名：`源 -> 目标`
    pub fn dataflow_name(&self, flow: &Dataflow) -> String {
        let source = self.element(flow.source).map(|e| e.name.as_str()).unwrap_or("?");
        let target = self.element(flow.target).map(|e| e.name.as_str()).unwrap_or("?");
        format!("{} -> {}", source, target)
    }

    /// 按匹配顺序遍历全部实体：先元素，后数据流
    pub fn entities(&self) -> impl Iterator<Item = EntityRef<'_>> + '_ {
        let elements = self.elements.iter().map(EntityRef::Element);
        let flows = self.dataflows.iter().map(move |flow| EntityRef::Dataflow {
            flow,
            name: self.dataflow_name(flow),
        });
        elements.chain(flows)
    }

    pub(crate) fn log_summary(&self) {
        debug!(
            "model [{}] built: {} elements, {} dataflows",
            self.name,
            self.elements.len(),
            self.dataflows.len()
        );
    }
}

/// 待匹配的实体引用
#[derive(Debug, Clone)]
pub enum EntityRef<'a> {
    Element(&'a Element),
    Dataflow { flow: &'a Dataflow, name: String },
}

impl EntityRef<'_> {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityRef::Element(element) => EntityKind::Element(element.kind),
            EntityRef::Dataflow { .. } => EntityKind::Dataflow,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            EntityRef::Element(element) => &element.name,
            EntityRef::Dataflow { name, .. } => name,
        }
    }
}

impl AttributeSource for EntityRef<'_> {
    fn flag(&self, name: &str) -> Option<bool> {
        match self {
            EntityRef::Element(element) => element.flag(name),
            EntityRef::Dataflow { flow, .. } => flow.flag(name),
        }
    }

    fn text(&self, name: &str) -> Option<&str> {
        match self {
            EntityRef::Element(element) => element.text(name),
            EntityRef::Dataflow { flow, .. } => flow.text(name),
        }
    }
}
