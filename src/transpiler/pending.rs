//! Pending-projection tracking.
//!
//! Every relational subtree yields a [`PendingNode`]: the chain of stages
//! built for it, innermost first, each paired with the alias it is exposed
//! under. The last stage is still open; a parent clause folds into it when
//! [`is_compatible`] allows, otherwise the open stage is closed by wrapping
//! it as a subquery.

use crate::sql::{InputExpr, StageId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// A stage together with the alias it is referenced by from outside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedStage {
    pub name: String,
    pub stage: StageId,
}

#[derive(Debug, Clone)]
pub struct PendingNode {
    pub selects: Vec<NamedStage>,
    /// Node of the join whose FROM clause this subtree sits in.
    pub join_parent: Option<NodeId>,
}

impl PendingNode {
    pub fn new(name: impl Into<String>, stage: StageId) -> Self {
        Self {
            selects: vec![NamedStage {
                name: name.into(),
                stage,
            }],
            join_parent: None,
        }
    }

    /// The open stage.
    pub fn last(&self) -> &NamedStage {
        // `new` seeds one entry and entries are only ever appended.
        &self.selects[self.selects.len() - 1]
    }

    /// Alias of the innermost stage; property resolution starts here.
    pub fn top_name(&self) -> &str {
        &self.selects[0].name
    }
}

#[derive(Debug, Default)]
pub struct Nodes {
    nodes: Vec<PendingNode>,
}

impl Nodes {
    pub fn push(&mut self, node: PendingNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }
}

impl std::ops::Index<NodeId> for Nodes {
    type Output = PendingNode;

    fn index(&self, id: NodeId) -> &PendingNode {
        &self.nodes[id.0]
    }
}

impl std::ops::IndexMut<NodeId> for Nodes {
    fn index_mut(&mut self, id: NodeId) -> &mut PendingNode {
        &mut self.nodes[id.0]
    }
}

/// Clause about to be attached to an input stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clause {
    Filter,
    GroupBy,
    Distinct,
    Sort,
    Skip,
    Project,
    Limit,
    NewInstance,
}

/// Whether `clause` can be folded into `stage` without changing meaning.
pub fn is_compatible(stage: &InputExpr, clause: Clause) -> bool {
    let projected = stage.projection.is_some();
    let grouped = stage.group_by.is_some();
    let ordered = stage.order_by.is_some();
    let skipped = stage.skip.is_some();
    let limited = stage.limit.is_some();

    match clause {
        Clause::Filter => !projected && !grouped && !skipped && !limited,
        Clause::GroupBy => {
            !projected && !grouped && !stage.distinct && !ordered && !skipped && !limited
        }
        Clause::Distinct => !ordered && !skipped && !limited,
        Clause::Sort => !projected && !grouped && !skipped && !limited,
        Clause::Skip => !projected && !skipped && !limited,
        Clause::Project => !projected && !stage.distinct,
        Clause::Limit | Clause::NewInstance => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::TypeUsage;
    use crate::sql::{ColumnExpr, OrderItem, SqlExpr};

    fn stage(setup: impl FnOnce(&mut InputExpr)) -> InputExpr {
        let mut stage = InputExpr::default();
        setup(&mut stage);
        stage
    }

    fn value() -> SqlExpr {
        SqlExpr::literal("1")
    }

    const CLAUSES: [Clause; 6] = [
        Clause::Filter,
        Clause::GroupBy,
        Clause::Distinct,
        Clause::Sort,
        Clause::Skip,
        Clause::Project,
    ];

    fn check(field: &str, blocked: &[Clause], setup: impl Fn(&mut InputExpr)) {
        let s = stage(setup);
        for clause in CLAUSES {
            assert_eq!(
                is_compatible(&s, clause),
                !blocked.contains(&clause),
                "{} set, attaching {:?}",
                field,
                clause
            );
        }
        assert!(is_compatible(&s, Clause::Limit));
        assert!(is_compatible(&s, Clause::NewInstance));
    }

    #[test]
    fn test_fresh_stage_accepts_everything() {
        check("nothing", &[], |_| {});
    }

    #[test]
    fn test_compatibility_per_field() {
        use Clause::*;
        check("projection", &[Filter, GroupBy, Sort, Skip, Project], |s| {
            s.projection = Some(vec![ColumnExpr::new(value(), "C1", TypeUsage::string())]);
        });
        check("group by", &[Filter, GroupBy, Sort], |s| s.group_by = Some(vec![value()]));
        check("distinct", &[GroupBy, Project], |s| s.distinct = true);
        check("order by", &[GroupBy, Distinct], |s| {
            s.order_by = Some(vec![OrderItem {
                expr: value(),
                ascending: true,
            }]);
        });
        check("skip", &[Filter, GroupBy, Distinct, Sort, Skip], |s| s.skip = Some(value()));
        check("limit", &[Filter, GroupBy, Distinct, Sort, Skip], |s| s.limit = Some(value()));
    }

    #[test]
    fn test_node_names() {
        let mut stages = crate::sql::Stages::new();
        let inner = stages.push(InputExpr::default());
        let outer = stages.push(InputExpr::default());
        let mut node = PendingNode::new("Extent1", inner);
        node.selects.push(NamedStage {
            name: "Filter1".into(),
            stage: outer,
        });
        assert_eq!(node.top_name(), "Extent1");
        assert_eq!(node.last().stage, outer);
    }
}
