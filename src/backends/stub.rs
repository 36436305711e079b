// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Test doubles: a registry of small numeric tasks, an event log to observe
//! scheduling, and a progress sink that records every report.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use serde_json::json;

use crate::builder::new_template;
use crate::config::{ConfigSpec, ConfigValues, ParamKind, ParamSpec, TypeRegistry};
use crate::engine::{TaskContext, TaskInputs, TaskOutputs};
use crate::graph::{IoSpecs, NodeId, NodeTemplate, PortSpec, Resource, ResourceRef, ResourceType};
use crate::traits::{PreRunCheck, ProgressSink, ResourceCodec, Task};

/// A fresh reference of type `resource_type`, not backed by any codec.
pub fn resource_ref(resource_type: &ResourceType) -> ResourceRef {
    ResourceRef::new(resource_type.clone())
}

/// Reads back a number stored by one of the stub tasks.
pub async fn read_number(codec: &dyn ResourceCodec, reference: &ResourceRef) -> i64 {
    codec
        .deserialize(reference)
        .await
        .expect("resource is stored")
        .content
        .as_i64()
        .expect("resource holds a number")
}

/// Ordered `start <path>` / `end <path>` lines written by the stub tasks.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: String) {
        self.0.lock().expect("event log poisoned").push(event);
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().expect("event log poisoned").clone()
    }

    pub fn position(&self, event: &str) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }

    pub fn count(&self, event: &str) -> usize {
        self.events().iter().filter(|e| *e == event).count()
    }
}

/// Progress sink recording every call as one line.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<String>>,
}

impl RecordingProgress {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().expect("progress poisoned").clone()
    }

    fn push(&self, event: String) {
        self.events.lock().expect("progress poisoned").push(event);
    }
}

impl ProgressSink for RecordingProgress {
    fn start(&self, node: &str) {
        self.push(format!("start {}", node));
    }

    fn set_value(&self, node: &str, value: f64, message: &str) {
        self.push(format!("value {} {} {}", node, value, message));
    }

    fn stop(&self, node: &str, message: &str) {
        self.push(format!("stop {} {}", node, message));
    }

    fn add_message(&self, node: &str, text: &str) {
        self.push(format!("message {} {}", node, text));
    }
}

/// Registry with the stub task types plus handles on the resource types.
///
/// Resource types: `Number`, `Table`, `DataTable` (a `Table`), `Image`.
pub struct Fixtures {
    pub registry: TypeRegistry,
    pub number: ResourceType,
    pub table: ResourceType,
    pub data_table: ResourceType,
    pub image: ResourceType,
    pub log: EventLog,
}

impl Fixtures {
    /// Template of a fresh node of `type_id` with default config.
    pub fn template(&self, type_id: &str) -> NodeTemplate {
        self.template_with(type_id, ConfigValues::default())
    }

    pub fn template_with(&self, type_id: &str, config: ConfigValues) -> NodeTemplate {
        let resolved = self.registry.resolve_type(type_id).expect("registered type");
        new_template(resolved, type_id, &config, NodeId::new()).expect("valid config")
    }
}

pub fn fixtures() -> Fixtures {
    let mut registry = TypeRegistry::new();
    let root = crate::config::consts::ROOT_RESOURCE_TYPE;
    let number = registry.register_resource_type("Number", root).expect("Number");
    let table = registry.register_resource_type("Table", root).expect("Table");
    let data_table = registry
        .register_resource_type("DataTable", "Table")
        .expect("DataTable");
    let image = registry.register_resource_type("Image", root).expect("Image");
    let log = EventLog::default();

    macro_rules! task {
        ($type_id:expr, $make:expr) => {{
            let number = number.clone();
            let table = table.clone();
            let image = image.clone();
            let log = log.clone();
            registry
                .register_task($type_id, move || -> Arc<dyn Task> {
                    let number = number.clone();
                    let table = table.clone();
                    let image = image.clone();
                    let log = log.clone();
                    Arc::new($make(number, table, image, log))
                })
                .expect($type_id);
        }};
    }

    task!("Source", |number, _, _, log| Source { number, log });
    task!("Step", |number, _, _, log| Step { number, log });
    task!("Join", |number, _, _, log| Join { number, log });
    task!("OptionalJoin", |number, _, _, log| OptionalJoin { number, log });
    task!("Fail", |number, _, _, log| Fail { number, log });
    task!("Veto", |number, _, _, log| Veto { number, log });
    task!("Panic", |number, _, _, _| Panic { number });
    task!("TableSource", |_, table, _, _| TableSource { table });
    task!("ImageViewer", |_, _, image, _| ImageViewer { image });
    task!("Merge", |number, _, _, log| Merge { number, log });
    task!("Split", |number, _, _, _| Split { number });
    task!("BadOutput", |number, table, _, _| BadOutput { number, table });

    Fixtures {
        registry,
        number,
        table,
        data_table,
        image,
        log,
    }
}

fn delay_spec() -> ConfigSpec {
    ConfigSpec::new().param("delay_ms", ParamSpec::new(ParamKind::Int).with_default(0))
}

async fn pause(ctx: &TaskContext) {
    let delay = ctx.config().get_i64("delay_ms").unwrap_or(0);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay as u64)).await;
    }
}

async fn load_number(ctx: &TaskContext, reference: &ResourceRef) -> anyhow::Result<i64> {
    ctx.load(reference)
        .await?
        .content
        .as_i64()
        .ok_or_else(|| anyhow!("resource {} is not a number", reference.id()))
}

async fn store_number(ctx: &TaskContext, number: &ResourceType, value: i64) -> anyhow::Result<ResourceRef> {
    ctx.store(Resource::new(number.clone(), json!(value))).await
}

/// Emits config `value` on `out`.
pub struct Source {
    number: ResourceType,
    log: EventLog,
}

#[async_trait]
impl Task for Source {
    async fn run(&self, ctx: TaskContext, _inputs: TaskInputs) -> anyhow::Result<TaskOutputs> {
        self.log.push(format!("start {}", ctx.instance_path()));
        pause(&ctx).await;
        let value = ctx.config().get_i64("value").unwrap_or_default();
        let out = store_number(&ctx, &self.number, value).await?;
        self.log.push(format!("end {}", ctx.instance_path()));
        Ok(TaskOutputs::new().with("out", out))
    }

    fn name(&self) -> &'static str {
        "Source"
    }

    fn output_specs(&self) -> IoSpecs {
        IoSpecs::fixed([("out", PortSpec::new(self.number.clone()))])
    }

    fn config_spec(&self) -> ConfigSpec {
        delay_spec().param("value", ParamSpec::new(ParamKind::Int).with_default(1))
    }
}

/// `out = in + add`
pub struct Step {
    number: ResourceType,
    log: EventLog,
}

#[async_trait]
impl Task for Step {
    async fn run(&self, ctx: TaskContext, inputs: TaskInputs) -> anyhow::Result<TaskOutputs> {
        self.log.push(format!("start {}", ctx.instance_path()));
        pause(&ctx).await;
        let value = load_number(&ctx, inputs.require("in")?).await?;
        let add = ctx.config().get_i64("add").unwrap_or(1);
        ctx.progress().set_value(1.0, "stepped");
        let out = store_number(&ctx, &self.number, value + add).await?;
        self.log.push(format!("end {}", ctx.instance_path()));
        Ok(TaskOutputs::new().with("out", out))
    }

    fn name(&self) -> &'static str {
        "Step"
    }

    fn input_specs(&self) -> IoSpecs {
        IoSpecs::fixed([("in", PortSpec::new(self.number.clone()))])
    }

    fn output_specs(&self) -> IoSpecs {
        IoSpecs::fixed([("out", PortSpec::new(self.number.clone()))])
    }

    fn config_spec(&self) -> ConfigSpec {
        delay_spec().param("add", ParamSpec::new(ParamKind::Int).with_default(1))
    }
}

/// `out = a + b`
pub struct Join {
    number: ResourceType,
    log: EventLog,
}

#[async_trait]
impl Task for Join {
    async fn run(&self, ctx: TaskContext, inputs: TaskInputs) -> anyhow::Result<TaskOutputs> {
        self.log.push(format!("start {}", ctx.instance_path()));
        let a = load_number(&ctx, inputs.require("a")?).await?;
        let b = load_number(&ctx, inputs.require("b")?).await?;
        let out = store_number(&ctx, &self.number, a + b).await?;
        self.log.push(format!("end {}", ctx.instance_path()));
        Ok(TaskOutputs::new().with("out", out))
    }

    fn name(&self) -> &'static str {
        "Join"
    }

    fn input_specs(&self) -> IoSpecs {
        IoSpecs::fixed([
            ("a", PortSpec::new(self.number.clone())),
            ("b", PortSpec::new(self.number.clone())),
        ])
    }

    fn output_specs(&self) -> IoSpecs {
        IoSpecs::fixed([("out", PortSpec::new(self.number.clone()))])
    }
}

/// `out = a + b`, where a missing `b` counts as zero and is logged.
pub struct OptionalJoin {
    number: ResourceType,
    log: EventLog,
}

#[async_trait]
impl Task for OptionalJoin {
    async fn run(&self, ctx: TaskContext, inputs: TaskInputs) -> anyhow::Result<TaskOutputs> {
        let a = load_number(&ctx, inputs.require("a")?).await?;
        let b = match inputs.get("b") {
            Some(b) => load_number(&ctx, b).await?,
            None => {
                self.log.push(format!("no b {}", ctx.instance_path()));
                0
            }
        };
        let out = store_number(&ctx, &self.number, a + b).await?;
        Ok(TaskOutputs::new().with("out", out))
    }

    fn name(&self) -> &'static str {
        "OptionalJoin"
    }

    fn input_specs(&self) -> IoSpecs {
        IoSpecs::fixed([
            ("a", PortSpec::new(self.number.clone())),
            ("b", PortSpec::new(self.number.clone()).optional()),
        ])
    }

    fn output_specs(&self) -> IoSpecs {
        IoSpecs::fixed([("out", PortSpec::new(self.number.clone()))])
    }
}

/// Fails with config `message` after `delay_ms`.
pub struct Fail {
    number: ResourceType,
    log: EventLog,
}

#[async_trait]
impl Task for Fail {
    async fn run(&self, ctx: TaskContext, _inputs: TaskInputs) -> anyhow::Result<TaskOutputs> {
        self.log.push(format!("start {}", ctx.instance_path()));
        pause(&ctx).await;
        let message = ctx.config().get_str("message").unwrap_or("boom").to_string();
        Err(anyhow!(message).context("stub failure"))
    }

    fn name(&self) -> &'static str {
        "Fail"
    }

    fn input_specs(&self) -> IoSpecs {
        IoSpecs::fixed([("in", PortSpec::new(self.number.clone()).optional())])
    }

    fn output_specs(&self) -> IoSpecs {
        IoSpecs::fixed([("out", PortSpec::new(self.number.clone()))])
    }

    fn config_spec(&self) -> ConfigSpec {
        delay_spec().param("message", ParamSpec::new(ParamKind::String).optional())
    }
}

/// Refuses to run.
pub struct Veto {
    number: ResourceType,
    log: EventLog,
}

#[async_trait]
impl Task for Veto {
    async fn run(&self, ctx: TaskContext, _inputs: TaskInputs) -> anyhow::Result<TaskOutputs> {
        self.log.push(format!("start {}", ctx.instance_path()));
        bail!("vetoed task must not run")
    }

    async fn check_before_run(&self, _ctx: &TaskContext, _inputs: &TaskInputs) -> PreRunCheck {
        PreRunCheck::Veto("inputs rejected".to_string())
    }

    fn name(&self) -> &'static str {
        "Veto"
    }

    fn output_specs(&self) -> IoSpecs {
        IoSpecs::fixed([("out", PortSpec::new(self.number.clone()))])
    }
}

pub struct Panic {
    number: ResourceType,
}

#[async_trait]
impl Task for Panic {
    async fn run(&self, _ctx: TaskContext, _inputs: TaskInputs) -> anyhow::Result<TaskOutputs> {
        panic!("stub panic");
    }

    fn name(&self) -> &'static str {
        "Panic"
    }

    fn output_specs(&self) -> IoSpecs {
        IoSpecs::fixed([("out", PortSpec::new(self.number.clone()))])
    }
}

pub struct TableSource {
    table: ResourceType,
}

#[async_trait]
impl Task for TableSource {
    async fn run(&self, ctx: TaskContext, _inputs: TaskInputs) -> anyhow::Result<TaskOutputs> {
        let out = ctx.store(Resource::new(self.table.clone(), json!([[1, 2]]))).await?;
        Ok(TaskOutputs::new().with("out", out))
    }

    fn name(&self) -> &'static str {
        "TableSource"
    }

    fn output_specs(&self) -> IoSpecs {
        IoSpecs::fixed([("out", PortSpec::new(self.table.clone()))])
    }
}

/// Passes an image through.
pub struct ImageViewer {
    image: ResourceType,
}

#[async_trait]
impl Task for ImageViewer {
    async fn run(&self, _ctx: TaskContext, inputs: TaskInputs) -> anyhow::Result<TaskOutputs> {
        Ok(TaskOutputs::new().with("out", inputs.require("in")?.clone()))
    }

    fn name(&self) -> &'static str {
        "ImageViewer"
    }

    fn input_specs(&self) -> IoSpecs {
        IoSpecs::fixed([("in", PortSpec::new(self.image.clone()))])
    }

    fn output_specs(&self) -> IoSpecs {
        IoSpecs::fixed([("out", PortSpec::new(self.image.clone()))])
    }
}

/// Sums its dynamic input group into `out`.
pub struct Merge {
    number: ResourceType,
    log: EventLog,
}

#[async_trait]
impl Task for Merge {
    async fn run(&self, ctx: TaskContext, inputs: TaskInputs) -> anyhow::Result<TaskOutputs> {
        let mut total = 0;
        for value in inputs.collection() {
            total += load_number(&ctx, value).await?;
        }
        self.log.push(format!("merged {} {}", inputs.collection().len(), ctx.instance_path()));
        let out = store_number(&ctx, &self.number, total).await?;
        Ok(TaskOutputs::new().with("out", out))
    }

    fn name(&self) -> &'static str {
        "Merge"
    }

    fn input_specs(&self) -> IoSpecs {
        IoSpecs::dynamic(
            Vec::<(String, PortSpec)>::new(),
            Some(PortSpec::new(self.number.clone()).optional()),
        )
    }

    fn output_specs(&self) -> IoSpecs {
        IoSpecs::fixed([("out", PortSpec::new(self.number.clone()))])
    }
}

/// Emits `0..count` as its dynamic output group.
pub struct Split {
    number: ResourceType,
}

#[async_trait]
impl Task for Split {
    async fn run(&self, ctx: TaskContext, _inputs: TaskInputs) -> anyhow::Result<TaskOutputs> {
        let count = ctx.config().get_i64("count").unwrap_or(0);
        let mut values = Vec::new();
        for value in 0..count {
            values.push(store_number(&ctx, &self.number, value).await?);
        }
        Ok(TaskOutputs::new().with_collection(values))
    }

    fn name(&self) -> &'static str {
        "Split"
    }

    fn output_specs(&self) -> IoSpecs {
        IoSpecs::dynamic(
            Vec::<(String, PortSpec)>::new(),
            Some(PortSpec::new(self.number.clone()).optional()),
        )
    }

    fn config_spec(&self) -> ConfigSpec {
        ConfigSpec::new().param("count", ParamSpec::new(ParamKind::Int).with_default(2))
    }
}

/// Breaks its output contract as told by config `mode`.
pub struct BadOutput {
    number: ResourceType,
    table: ResourceType,
}

#[async_trait]
impl Task for BadOutput {
    async fn run(&self, ctx: TaskContext, _inputs: TaskInputs) -> anyhow::Result<TaskOutputs> {
        match ctx.config().get_str("mode") {
            Some("wrong_type") => {
                let out = ctx.store(Resource::new(self.table.clone(), json!([]))).await?;
                Ok(TaskOutputs::new().with("out", out))
            }
            _ => Ok(TaskOutputs::new()),
        }
    }

    fn name(&self) -> &'static str {
        "BadOutput"
    }

    fn output_specs(&self) -> IoSpecs {
        IoSpecs::fixed([("out", PortSpec::new(self.number.clone()))])
    }

    fn config_spec(&self) -> ConfigSpec {
        ConfigSpec::new().param("mode", ParamSpec::new(ParamKind::String).with_default("missing"))
    }
}
