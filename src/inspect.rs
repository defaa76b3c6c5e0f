//! Inspection snapshots
//!
//! Whenever the remote process stops the session takes a snapshot of the stopped thread, the call
//! stack, the locals of the top frame and the fields of `this`, and hands it to the view.

use crate::line_map::LineMap;
use crate::notifier::log_msg;
use crate::remote::{CodeLocation, ObjectRef, RemoteProcess, RemoteValue, ThreadRef, Variable};
use crate::server::{LogLevel, Notification};
use crate::util::log_error;

use tokio::sync::mpsc::UnboundedSender;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VariableNode {
    name: String,
    #[serde(rename = "type")]
    type_name: String,
    value: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<VariableNode>,
}

impl VariableNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn children(&self) -> &Vec<VariableNode> {
        &self.children
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Inspection {
    #[serde(rename = "callStack")]
    call_stack: Vec<String>,
    #[serde(rename = "localsAt")]
    locals_at: String,
    locals: Vec<VariableNode>,
    #[serde(rename = "thisName")]
    this_name: String,
    #[serde(rename = "thisFields")]
    this_fields: Vec<VariableNode>,
}

impl Inspection {
    /// Snapshot a suspended thread. `field_depth` is how many levels of fields to expand below
    /// each local and below the fields of `this`. Anything that can't be read is logged and left
    /// out, a thread that isn't suspended gives an empty snapshot.
    pub fn capture(
        remote: &dyn RemoteProcess,
        thread: &ThreadRef,
        line_map: Option<&LineMap>,
        field_depth: usize,
        max_frames: usize,
        notifier_tx: &UnboundedSender<Notification>,
    ) -> Self {
        let mut inspection = Inspection::default();

        match remote.is_suspended(thread) {
            Ok(true) => {}
            Ok(false) => {
                log_msg(
                    notifier_tx,
                    LogLevel::DEBUG,
                    &format!("Can't inspect thread {}, it's not suspended", thread.name()),
                );
                return inspection;
            }
            Err(e) => {
                log_error(notifier_tx, &e);
                return inspection;
            }
        }

        let frames = match remote.frames(thread) {
            Ok(f) => f,
            Err(e) => {
                log_error(notifier_tx, &e);
                return inspection;
            }
        };

        let top = match frames.first() {
            Some(f) => f,
            None => {
                log_msg(notifier_tx, LogLevel::DEBUG, "Call stack empty");
                return inspection;
            }
        };

        inspection.call_stack = frames
            .iter()
            .take(max_frames)
            .map(|f| location_to_string(f, line_map))
            .collect();
        inspection.locals_at = location_to_string(top, line_map);

        match remote.locals(thread, 0) {
            Ok(locals) => {
                inspection.locals = locals
                    .iter()
                    .map(|v| {
                        let children = match field_depth {
                            0 => vec![],
                            _ => child_fields(remote, v, field_depth - 1, notifier_tx),
                        };
                        variable_node(v, children)
                    })
                    .collect();
            }
            Err(e) => log_error(notifier_tx, &e),
        }

        match remote.this_object(thread, 0) {
            Ok(Some(this)) => {
                inspection.this_name = this.type_name().to_string();
                inspection.this_fields = fields(remote, &this, field_depth, notifier_tx);
            }
            // Static method
            Ok(None) => {}
            Err(e) => log_error(notifier_tx, &e),
        }

        inspection
    }

    pub fn call_stack(&self) -> &Vec<String> {
        &self.call_stack
    }

    pub fn locals_at(&self) -> &str {
        &self.locals_at
    }

    pub fn locals(&self) -> &Vec<VariableNode> {
        &self.locals
    }

    pub fn this_name(&self) -> &str {
        &self.this_name
    }

    pub fn this_fields(&self) -> &Vec<VariableNode> {
        &self.this_fields
    }

    pub fn is_empty(&self) -> bool {
        self.call_stack.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Render a code location as `Class.method:line`, the line is in sketch space where there's a
/// mapping and in the generated file otherwise.
pub fn location_to_string(location: &CodeLocation, line_map: Option<&LineMap>) -> String {
    let line_num = match line_map.and_then(|m| m.target_to_sketch(location.position()).ok()) {
        Some(sketch) => sketch.line_num(),
        None => location.position().line_num(),
    };
    format!(
        "{}.{}:{}",
        location.declaring_class(),
        location.method(),
        line_num
    )
}

fn value_to_string(value: &RemoteValue) -> String {
    match value {
        RemoteValue::Null => "null".to_string(),
        RemoteValue::Primitive(s) => s.clone(),
        RemoteValue::Object(o) => format!("instance of {}(id={})", o.type_name(), o.id()),
    }
}

fn variable_node(variable: &Variable, children: Vec<VariableNode>) -> VariableNode {
    VariableNode {
        name: variable.name().to_string(),
        type_name: variable.type_name().to_string(),
        value: value_to_string(variable.value()),
        children,
    }
}

fn child_fields(
    remote: &dyn RemoteProcess,
    variable: &Variable,
    depth: usize,
    notifier_tx: &UnboundedSender<Notification>,
) -> Vec<VariableNode> {
    match variable.value() {
        RemoteValue::Object(o) => fields(remote, o, depth, notifier_tx),
        _ => vec![],
    }
}

/// Fields of an object, expanded `depth` further levels
fn fields(
    remote: &dyn RemoteProcess,
    object: &ObjectRef,
    depth: usize,
    notifier_tx: &UnboundedSender<Notification>,
) -> Vec<VariableNode> {
    let fields = match remote.fields(object) {
        Ok(f) => f,
        Err(e) => {
            log_error(notifier_tx, &e);
            return vec![];
        }
    };

    fields
        .iter()
        .map(|f| {
            let children = match depth {
                0 => vec![],
                _ => child_fields(remote, f, depth - 1, notifier_tx),
            };
            variable_node(f, children)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::mpsc;

    use super::Inspection;
    use crate::line_map::{annotate, LineMap};
    use crate::remote::mock::MockRemote;
    use crate::remote::{ObjectRef, RemoteValue, ThreadRef, Variable};

    fn remote() -> (Arc<MockRemote>, ThreadRef) {
        let remote = MockRemote::new("Sketch.java");
        let thread = ThreadRef::new(1, "Animation Thread".to_string());
        remote.with_thread(thread.clone(), true);

        let ball = ObjectRef::new(20, "Sketch$Ball".to_string());
        remote.with_frames(
            vec![
                remote.location("Sketch", "draw", 2),
                remote.location("processing.core.PApplet", "handleDraw", 2210),
            ],
            vec![
                Variable::new(
                    "i".to_string(),
                    "int".to_string(),
                    RemoteValue::Primitive("3".to_string()),
                ),
                Variable::new(
                    "b".to_string(),
                    "Sketch$Ball".to_string(),
                    RemoteValue::Object(ball.clone()),
                ),
            ],
            Some(ObjectRef::new(10, "Sketch".to_string())),
        );
        remote.with_fields(
            10,
            vec![Variable::new(
                "ball".to_string(),
                "Sketch$Ball".to_string(),
                RemoteValue::Object(ball),
            )],
        );
        remote.with_fields(
            20,
            vec![
                Variable::new(
                    "x".to_string(),
                    "float".to_string(),
                    RemoteValue::Primitive("1.5".to_string()),
                ),
                Variable::new("next".to_string(), "Sketch$Ball".to_string(), RemoteValue::Null),
            ],
        );

        (remote, thread)
    }

    fn line_map() -> LineMap {
        let source = format!(
            "public class Sketch {{\n{}\n}}\n",
            annotate("A.pde", "void draw() {\n  i++;\n}")
        );
        LineMap::build("Sketch.java", &source)
    }

    #[test]
    fn check_snapshot_uses_sketch_lines() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let (remote, thread) = remote();
        let map = line_map();

        let inspection = Inspection::capture(remote.as_ref(), &thread, Some(&map), 0, 64, &tx);

        assert_eq!(
            inspection.call_stack(),
            &vec![
                "Sketch.draw:2".to_string(),
                "processing.core.PApplet.handleDraw:2211".to_string(),
            ]
        );
        assert_eq!(inspection.locals_at(), "Sketch.draw:2");
        assert_eq!(inspection.locals().len(), 2);
        assert_eq!(inspection.locals()[0].value(), "3");
        assert!(inspection.locals()[1].children().is_empty());
        assert_eq!(inspection.this_name(), "Sketch");
        assert_eq!(inspection.this_fields()[0].value(), "instance of Sketch$Ball(id=20)");
        assert!(inspection.this_fields()[0].children().is_empty());
    }

    #[test]
    fn check_field_depth_expands_objects() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let (remote, thread) = remote();

        let inspection = Inspection::capture(remote.as_ref(), &thread, None, 1, 64, &tx);

        let b = &inspection.locals()[1];
        assert_eq!(b.children().len(), 2);
        assert_eq!(b.children()[1].value(), "null");
        assert!(b.children()[0].children().is_empty());

        let ball = &inspection.this_fields()[0];
        assert_eq!(ball.children()[0].name(), "x");
        assert_eq!(inspection.call_stack()[0], "Sketch.draw:3");
    }

    #[test]
    fn check_max_frames_limits_call_stack() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let (remote, thread) = remote();

        let inspection = Inspection::capture(remote.as_ref(), &thread, None, 0, 1, &tx);

        assert_eq!(inspection.call_stack().len(), 1);
    }

    #[test]
    fn check_running_thread_gives_empty_snapshot() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (remote, thread) = remote();
        remote.set_suspended(&thread, false);

        let inspection = Inspection::capture(remote.as_ref(), &thread, None, 0, 64, &tx);

        assert!(inspection.is_empty());
        assert!(inspection.locals().is_empty());
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn check_json_shape() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let (remote, thread) = remote();

        let json = Inspection::capture(remote.as_ref(), &thread, None, 0, 64, &tx).to_json();

        assert_eq!(json["thisName"], serde_json::json!("Sketch"));
        assert_eq!(
            json["locals"][0],
            serde_json::json!({"name":"i","type":"int","value":"3"})
        );
    }
}
