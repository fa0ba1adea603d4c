//! Graph construction passes.
//!
//! Every pass walks the staff tree in the same post-order, so clusters and
//! nodes appear in the DOT output in first-encounter order:
//!
//! 1. graph attributes, with the direction picked from the tree's shape
//! 2. one cluster per team
//! 3. one node per member, inside its team's cluster
//! 4. one edge per direct report
//! 5. optional rank groups aligning roots or leaves

use std::collections::{HashMap, HashSet};

use tracing::warn;

use super::config::OrgChartOptions;
use super::graph::{Graph, Node};
use super::model::{Direction, Justification, Organization, Person, StaffMember};
use super::traverse::{find_person_by_value, visit_staff};
use crate::common::{Error, Result};
use crate::template::value::format_number;

const TITLE_PLACEHOLDER: &str = "Title?";

type NodeKey<'a> = (&'a str, Option<&'a str>);

/// Builds the Graphviz description of one organization.
#[derive(Debug, Clone)]
pub struct GraphBuilder<'a> {
    organization: &'a Organization,
    staff: &'a [StaffMember],
    accented: &'a [Person],
    noteworthy: &'a [Person],
    options: &'a OrgChartOptions,
}

impl<'a> GraphBuilder<'a> {
    /// Chart `staff`, which is normally `organization.staff` or a pruned copy.
    pub fn new(
        organization: &'a Organization,
        staff: &'a [StaffMember],
        options: &'a OrgChartOptions,
    ) -> Self {
        Self {
            organization,
            staff,
            accented: &[],
            noteworthy: &[],
            options,
        }
    }

    #[inline]
    pub fn with_accented(mut self, people: &'a [Person]) -> Self {
        self.accented = people;
        self
    }

    #[inline]
    pub fn with_noteworthy(mut self, people: &'a [Person]) -> Self {
        self.noteworthy = people;
        self
    }

    pub fn build(&self) -> Result<Graph> {
        let mut graph = self.create_graph();
        self.add_team_clusters(&mut graph);
        let ids = self.add_staff_nodes(&mut graph);
        self.add_staff_edges(&mut graph, &ids)?;
        self.add_rank_groups(&mut graph, &ids)?;
        Ok(graph)
    }

    fn create_graph(&self) -> Graph {
        let mut breadth = 0usize;
        let mut depth = 0usize;
        visit_staff(self.staff, |member, ancestors| {
            if member.is_leaf() {
                breadth += 1;
            }
            depth = depth.max(ancestors.len() + 1);
        });

        let direction = self.organization.org_chart_direction.unwrap_or(
            if breadth > 3 && breadth > depth {
                Direction::LeftToRight
            } else {
                Direction::TopToBottom
            },
        );

        let org_name = &self.organization.org_name;
        let options = self.options;
        let mut graph = Graph::new(org_name.as_str());
        graph
            .set("clusterrank", "local")
            .set("fontsize", options.graph_font_size)
            .set("label", format!("{org_name} Org Chart"))
            .set("labelloc", "t")
            .set("newrank", true)
            .set("pad", options.padding_inches)
            .set("rankdir", direction.as_str())
            .set("ratio", "fill")
            .set(
                "size",
                format!(
                    "{},{}",
                    format_number(options.width_inches),
                    format_number(options.height_inches)
                ),
            )
            .set("splines", "ortho");
        graph
    }

    fn add_team_clusters(&self, graph: &mut Graph) {
        let font_size = self.options.cluster_font_size;
        visit_staff(self.staff, |member, _| {
            let id = team_cluster_id(&member.person.team);
            if graph.subgraph(&id).is_none() {
                graph
                    .add_subgraph(&id)
                    .set("fontsize", font_size)
                    .set("label", member.person.team.as_str())
                    .set("labelloc", "t")
                    .set("style", "filled");
            }
        });
    }

    /// Returns the DOT id assigned to each `(name, title)` key.
    fn add_staff_nodes(&self, graph: &mut Graph) -> HashMap<NodeKey<'a>, String> {
        let mut ids: HashMap<NodeKey<'a>, String> = HashMap::new();
        let mut taken: HashSet<String> = HashSet::new();

        visit_staff(self.staff, |member, _| {
            let person = &member.person;
            let key = node_key(person);
            if ids.contains_key(&key) {
                warn!(
                    name = %person.name,
                    title = person.title.as_deref().unwrap_or(TITLE_PLACEHOLDER),
                    "duplicate person in org chart; reusing the first node"
                );
                return;
            }

            let id = if taken.contains(&person.name) {
                format!(
                    "{} ({})",
                    person.name,
                    person.title.as_deref().unwrap_or(TITLE_PLACEHOLDER)
                )
            } else {
                person.name.clone()
            };
            taken.insert(id.clone());

            let node = self.staff_node(&id, person);
            graph.add_subgraph(&team_cluster_id(&person.team)).add_node(node);
            ids.insert(key, id);
        });

        ids
    }

    fn staff_node(&self, id: &str, person: &Person) -> Node {
        let class = if find_person_by_value(self.accented, person).is_some() {
            "accent"
        } else if find_person_by_value(self.noteworthy, person).is_some() {
            "note"
        } else {
            "default"
        };

        let mut lines = vec![
            person.name.clone(),
            person
                .title
                .clone()
                .unwrap_or_else(|| TITLE_PLACEHOLDER.to_string()),
        ];
        if let Some(specialties) = person.specialties.as_ref().filter(|s| !s.is_empty()) {
            lines.push(format!("({})", specialties.join(", ")));
        }

        let options = self.options;
        let mut node = Node::new(id);
        node.attributes
            .set("class", class)
            .set("fontsize", options.node_font_size)
            .set("height", options.node_height_inches);
        if let Some(href) = person.primary_url() {
            node.attributes.set("href", href);
        }
        node.attributes
            .set("label", lines.join("\n"))
            .set("shape", "rectangle")
            .set("style", "filled,rounded")
            .set("width", options.node_width_inches);
        node
    }

    fn add_staff_edges(&self, graph: &mut Graph, ids: &HashMap<NodeKey<'a>, String>) -> Result<()> {
        let mut result = Ok(());
        visit_staff(self.staff, |member, _| {
            if result.is_err() {
                return;
            }
            for report in member.reports() {
                match (node_id(ids, &member.person), node_id(ids, &report.person)) {
                    (Ok(from), Ok(to)) => {
                        graph.add_edge(from, to);
                    },
                    (Err(err), _) | (_, Err(err)) => {
                        result = Err(err);
                        return;
                    },
                }
            }
        });
        result
    }

    fn add_rank_groups(&self, graph: &mut Graph, ids: &HashMap<NodeKey<'a>, String>) -> Result<()> {
        let org_name = &self.organization.org_name;
        match self.organization.org_chart_justification {
            Some(Justification::Roots) => {
                let roots: Vec<&StaffMember> =
                    self.staff.iter().filter(|member| !member.is_leaf()).collect();
                add_rank_group(graph, ids, &format!("{org_name} Root"), &roots, "source")?;

                let mut result = Ok(());
                visit_staff(self.staff, |member, _| {
                    if result.is_ok()
                        && let Ok(parent) = node_id(ids, &member.person)
                    {
                        let reports: Vec<&StaffMember> = member.reports().iter().collect();
                        result = add_rank_group(graph, ids, parent, &reports, "same");
                    }
                });
                result
            },
            Some(Justification::Leaves) => {
                let group = graph.add_subgraph(&format!("{org_name} Leaf Staff"));
                group.set("rank", "sink");
                let mut result = Ok(());
                visit_staff(self.staff, |member, _| {
                    if result.is_ok() && member.is_leaf() {
                        match node_id(ids, &member.person) {
                            Ok(id) => {
                                group.add_node(Node::new(id));
                            },
                            Err(err) => result = Err(err),
                        }
                    }
                });
                result
            },
            None => Ok(()),
        }
    }
}

/// Adds a same-rank group for `members` when there are at least two.
fn add_rank_group(
    graph: &mut Graph,
    ids: &HashMap<NodeKey<'_>, String>,
    parent: &str,
    members: &[&StaffMember],
    rank: &str,
) -> Result<()> {
    if members.len() < 2 {
        return Ok(());
    }
    let mut nodes = Vec::with_capacity(members.len());
    for member in members {
        nodes.push(Node::new(node_id(ids, &member.person)?));
    }
    let group = graph.add_subgraph(&format!("{parent} Staff"));
    group.set("rank", rank);
    group.nodes.extend(nodes);
    Ok(())
}

fn team_cluster_id(team: &str) -> String {
    format!("cluster {team}")
}

fn node_key(person: &Person) -> NodeKey<'_> {
    (person.name.as_str(), person.title.as_deref())
}

fn node_id<'m>(ids: &'m HashMap<NodeKey<'m>, String>, person: &'m Person) -> Result<&'m str> {
    ids.get(&node_key(person))
        .map(String::as_str)
        .ok_or_else(|| {
            Error::InvalidState(format!("org chart has no node for '{}'", person.name))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(name: &str, team: &str, title: &str) -> Person {
        Person::new(name, team).with_title(title)
    }

    fn leaf(name: &str, team: &str) -> StaffMember {
        StaffMember::new(person(name, team, "Engineer"))
    }

    fn org() -> Organization {
        Organization::new(
            "Acme",
            vec![StaffMember::new(person("Ada", "Exec", "CEO")).with_staff(vec![
                StaffMember::new(person("Bob", "Eng", "VP")).with_staff(vec![
                    leaf("Cy", "Eng"),
                    leaf("Di", "Eng"),
                ]),
                leaf("Eve", "Ops"),
            ])],
        )
    }

    fn build(org: &Organization) -> Graph {
        let options = OrgChartOptions::default();
        GraphBuilder::new(org, &org.staff, &options).build().unwrap()
    }

    #[test]
    fn graph_attributes_follow_the_options() {
        let graph = build(&org());
        assert_eq!(graph.name(), "Acme");
        assert_eq!(graph.attribute("label"), Some("Acme Org Chart"));
        assert_eq!(graph.attribute("size"), Some("13.333,7.5"));
        assert_eq!(graph.attribute("fontsize"), Some("40"));
        assert_eq!(graph.attribute("pad"), Some("0.5"));
        assert_eq!(graph.attribute("splines"), Some("ortho"));
        assert_eq!(graph.attribute("newrank"), Some("true"));
    }

    #[test]
    fn direction_depends_on_shape() {
        // 3 leaves, depth 3: tall.
        assert_eq!(build(&org()).attribute("rankdir"), Some("TB"));

        let wide = Organization::new(
            "Wide",
            vec![StaffMember::new(person("Ada", "Exec", "CEO")).with_staff(
                ["a", "b", "c", "d"].iter().map(|n| leaf(n, "Eng")).collect(),
            )],
        );
        assert_eq!(build(&wide).attribute("rankdir"), Some("LR"));

        let forced = wide.with_direction(Direction::TopToBottom);
        assert_eq!(build(&forced).attribute("rankdir"), Some("TB"));
    }

    #[test]
    fn clusters_in_first_encounter_order() {
        let graph = build(&org());
        let ids: Vec<&str> = graph.subgraphs().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["cluster Eng", "cluster Ops", "cluster Exec"]);
        let eng = graph.subgraph("cluster Eng").unwrap();
        assert_eq!(eng.attributes.get("label"), Some("Eng"));
        assert_eq!(eng.attributes.get("style"), Some("filled"));
        let names: Vec<&str> = eng.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(names, ["Cy", "Di", "Bob"]);
    }

    #[test]
    fn node_labels_classes_and_links() {
        let mut org = org();
        org.staff[0].person.specialties = Some(vec!["Strategy".into(), "Sales".into()]);
        org.staff[0].person.url = Some("https://example.com/ada".into());
        org.staff[0].staff.as_mut().unwrap()[1].person.title = None;

        let accented = [Person::new("Ada", "Exec")];
        let noteworthy = [Person::new("Eve", "Ops")];
        let options = OrgChartOptions::default();
        let graph = GraphBuilder::new(&org, &org.staff, &options)
            .with_accented(&accented)
            .with_noteworthy(&noteworthy)
            .build()
            .unwrap();

        let node = |id: &str| graph.declared_nodes().find(|n| n.id == id).unwrap().clone();
        let ada = node("Ada");
        assert_eq!(ada.attributes.get("class"), Some("accent"));
        assert_eq!(ada.attributes.get("label"), Some("Ada\nCEO\n(Strategy, Sales)"));
        assert_eq!(ada.attributes.get("href"), Some("https://example.com/ada"));
        assert_eq!(ada.attributes.get("shape"), Some("rectangle"));
        assert_eq!(ada.attributes.get("style"), Some("filled,rounded"));
        assert_eq!(ada.attributes.get("width"), Some("3.25"));

        let eve = node("Eve");
        assert_eq!(eve.attributes.get("class"), Some("note"));
        assert_eq!(eve.attributes.get("label"), Some("Eve\nTitle?"));
        assert_eq!(eve.attributes.get("href"), None);

        assert_eq!(node("Cy").attributes.get("class"), Some("default"));
    }

    #[test]
    fn one_edge_per_direct_report() {
        let graph = build(&org());
        let edges: Vec<(&str, &str)> = graph
            .edges()
            .iter()
            .map(|e| (e.from.as_str(), e.to.as_str()))
            .collect();
        assert_eq!(edges, [("Bob", "Cy"), ("Bob", "Di"), ("Ada", "Bob"), ("Ada", "Eve")]);
    }

    #[test]
    fn roots_justification_groups_managers_and_reports() {
        let org = org().with_justification(Justification::Roots);
        let graph = build(&org);
        // A single root gets no root group.
        assert!(graph.subgraph("Acme Root Staff").is_none());

        let bob = graph.subgraph("Bob Staff").unwrap();
        assert_eq!(bob.attributes.get("rank"), Some("same"));
        let members: Vec<&str> = bob.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(members, ["Cy", "Di"]);
        assert!(graph.subgraph("Ada Staff").is_some());
    }

    #[test]
    fn roots_justification_anchors_multiple_roots_at_source() {
        let mut org = org().with_justification(Justification::Roots);
        org.staff.push(
            StaffMember::new(person("Zed", "Board", "Chair"))
                .with_staff(vec![leaf("Yu", "Board")]),
        );
        let graph = build(&org);
        let root = graph.subgraph("Acme Root Staff").unwrap();
        assert_eq!(root.attributes.get("rank"), Some("source"));
        let members: Vec<&str> = root.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(members, ["Ada", "Zed"]);
    }

    #[test]
    fn leaves_justification_sinks_every_leaf() {
        let org = org().with_justification(Justification::Leaves);
        let graph = build(&org);
        let group = graph.subgraph("Acme Leaf Staff").unwrap();
        assert_eq!(group.attributes.get("rank"), Some("sink"));
        let members: Vec<&str> = group.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(members, ["Cy", "Di", "Eve"]);
    }

    #[test]
    fn duplicate_people_reuse_the_first_node() {
        let org = Organization::new(
            "Dup",
            vec![StaffMember::new(person("Ada", "Exec", "CEO")).with_staff(vec![
                leaf("Cy", "Eng"),
                leaf("Cy", "Eng"),
                StaffMember::new(person("Cy", "Eng", "Manager")),
            ])],
        );
        let graph = build(&org);
        let ids: Vec<&str> = graph.declared_nodes().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["Cy", "Cy (Manager)", "Ada"]);
        assert_eq!(graph.edges().len(), 3);
        assert_eq!(graph.edges()[1].to, "Cy");
        assert_eq!(graph.edges()[2].to, "Cy (Manager)");
    }
}
