use crate::ast::{Node, Plan, TreeDef};
use crate::formatter::config::FormatterConfig;
use crate::primitive::phrase::node_phrase;
use crate::tokenizer::markup::escape;

pub struct FormatterVisitor {
    config: FormatterConfig,
    indent_level: usize,
    output: String,
}

impl FormatterVisitor {
    pub fn new(config: FormatterConfig) -> Self {
        Self {
            config,
            indent_level: 0,
            output: String::new(),
        }
    }

    pub fn format_plan(mut self, plan: &Plan) -> String {
        if self.config.prolog {
            self.write("<?xml version=\"1.0\"?>");
            self.newline();
        }
        self.write(&format!(
            "<root main_tree_to_execute=\"{}\">",
            escape(&plan.main_tree)
        ));
        self.indent();
        for tree in &plan.trees {
            self.newline();
            self.format_tree(tree);
        }
        self.dedent();
        self.newline();
        self.write("</root>");
        self.newline();
        self.output
    }

    /// Renders a single node, e.g. a resolved main tree.
    pub fn format_node(mut self, node: &Node) -> String {
        self.visit_node(node);
        self.output
    }

    fn format_tree(&mut self, tree: &TreeDef) {
        self.write(&format!("<BehaviorTree ID=\"{}\">", escape(&tree.id)));
        self.indent();
        self.newline();
        self.visit_node(&tree.root);
        self.dedent();
        self.newline();
        self.write("</BehaviorTree>");
    }

    fn visit_node(&mut self, node: &Node) {
        match node {
            Node::Sequence { children } => self.composite("Sequence", &[], children),
            Node::Fallback { children } => self.composite("Fallback", &[], children),
            Node::Retry { attempts, child } => self.composite(
                "RetryUntilSuccessful",
                &[("num_attempts", attempts.to_string())],
                std::slice::from_ref(child.as_ref()),
            ),
            Node::Timeout { budget, child } => self.composite(
                "Timeout",
                &[("msec", budget.as_millis().to_string())],
                std::slice::from_ref(child.as_ref()),
            ),
            Node::SubTree { id, bindings } => {
                let mut attributes = vec![("ID", id.clone())];
                attributes.extend(
                    bindings
                        .iter()
                        .map(|binding| (binding.formal.as_str(), binding.value.to_string())),
                );
                self.leaf("SubTree", &attributes);
            }
            Node::Action { id, obj, name } => {
                self.annotate(node);
                let mut attributes = vec![("ID", id.clone())];
                if let Some(obj) = obj {
                    attributes.push(("obj", obj.to_string()));
                }
                if let Some(name) = name {
                    attributes.push(("name", name.clone()));
                }
                self.leaf("Action", &attributes);
            }
            Node::Condition { id, obj, name } => {
                self.annotate(node);
                let mut attributes = vec![("ID", id.clone()), ("obj", obj.to_string())];
                if let Some(name) = name {
                    attributes.push(("name", name.clone()));
                }
                self.leaf("Condition", &attributes);
            }
        }
    }

    fn composite(&mut self, tag: &str, attributes: &[(&str, String)], children: &[Node]) {
        self.open(tag, attributes, false);
        self.indent();
        for child in children {
            self.newline();
            self.visit_node(child);
        }
        self.dedent();
        self.newline();
        self.write(&format!("</{}>", tag));
    }

    fn leaf(&mut self, tag: &str, attributes: &[(&str, String)]) {
        self.open(tag, attributes, true);
    }

    fn open(&mut self, tag: &str, attributes: &[(&str, String)], self_closing: bool) {
        self.write("<");
        self.write(tag);
        for (name, value) in attributes {
            self.write(&format!(" {}=\"{}\"", name, escape(value)));
        }
        self.write(if self_closing { "/>" } else { ">" });
    }

    fn annotate(&mut self, node: &Node) {
        if !self.config.annotate {
            return;
        }
        if let Some(phrase) = node_phrase(node) {
            self.write(&format!("<!-- {} -->", phrase.replace("--", "- -")));
            self.newline();
        }
    }

    fn write(&mut self, text: &str) {
        self.output.push_str(text);
    }

    fn indent(&mut self) {
        self.indent_level += 1;
    }

    fn dedent(&mut self) {
        self.indent_level = self.indent_level.saturating_sub(1);
    }

    fn newline(&mut self) {
        self.output.push('\n');
        self.output
            .push_str(&" ".repeat(self.indent_level * self.config.indent_spaces));
    }
}
