use std::cmp::Reverse;
use std::collections::HashMap;

use egen_spec::types::api::ClassSpec;

use crate::error::CodegenError;

/// Requirement graph over the classes of one namespace.
///
/// Edge semantics: `A -> B` means B requires A, so A must be emitted first.
/// Requirements naming classes outside the set are ignored.
#[derive(Debug, Clone)]
pub struct ClassGraph<'a> {
    classes: Vec<&'a ClassSpec>,
    /// Key: requirement index, Value: dependent indices
    dependents: Vec<Vec<usize>>,
    edges: Vec<(usize, usize)>,
}

impl<'a> ClassGraph<'a> {
    pub fn new(classes: &'a [ClassSpec]) -> Self {
        let mut index: HashMap<&str, usize> = HashMap::new();
        for (i, class) in classes.iter().enumerate() {
            index.entry(class.name.as_str()).or_insert(i);
        }

        let mut graph = Self {
            classes: classes.iter().collect(),
            dependents: vec![Vec::new(); classes.len()],
            edges: Vec::new(),
        };
        for (dependent, class) in classes.iter().enumerate() {
            for requirement in &class.requires {
                match index.get(requirement.as_str()) {
                    Some(&req) => graph.add_edge(req, dependent),
                    None => log::debug!(
                        "class {} requires {} from outside its namespace",
                        class.name,
                        requirement
                    ),
                }
            }
        }
        graph
    }

    fn add_edge(&mut self, requirement: usize, dependent: usize) {
        if !self.dependents[requirement].contains(&dependent) {
            self.dependents[requirement].push(dependent);
            self.edges.push((requirement, dependent));
        }
    }

    /// Names of the classes that directly require `name`.
    pub fn dependents(&self, name: &str) -> Vec<&str> {
        self.classes
            .iter()
            .position(|c| c.name == name)
            .map(|i| {
                self.dependents[i]
                    .iter()
                    .map(|&d| self.classes[d].name.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    fn cycle_error(&self, (requirement, dependent): (usize, usize)) -> CodegenError {
        CodegenError::CircularDependency {
            requirement: self.classes[requirement].name.clone(),
            dependent: self.classes[dependent].name.clone(),
        }
    }

    /// Longest path from every class to a class nothing depends on.
    pub fn depths(&self) -> Result<Vec<usize>, CodegenError> {
        let n = self.classes.len();
        let mut depth: Vec<Option<usize>> = self
            .dependents
            .iter()
            .map(|deps| if deps.is_empty() { Some(0) } else { None })
            .collect();
        if n > 0 && depth.iter().all(Option::is_none) {
            return Err(self.cycle_error(self.edges[0]));
        }

        let relax = |depth: &[Option<usize>], (req, dep): (usize, usize)| -> Option<usize> {
            let candidate = depth[dep]? + 1;
            match depth[req] {
                Some(current) if current >= candidate => None,
                _ => Some(candidate),
            }
        };

        for _ in 1..n {
            let mut changed = false;
            for &edge in &self.edges {
                if let Some(candidate) = relax(depth.as_slice(), edge) {
                    depth[edge.0] = Some(candidate);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        for &edge in &self.edges {
            if relax(depth.as_slice(), edge).is_some() || depth[edge.0].is_none() {
                return Err(self.cycle_error(edge));
            }
        }
        Ok(depth.into_iter().map(Option::unwrap_or_default).collect())
    }
}

/// Order classes so every class comes after the classes it requires.
/// Ties keep declaration order.
pub fn resolve(classes: &[ClassSpec]) -> Result<Vec<&ClassSpec>, CodegenError> {
    let depths = ClassGraph::new(classes).depths()?;
    let mut order: Vec<usize> = (0..classes.len()).collect();
    order.sort_by_key(|&i| Reverse(depths[i]));
    Ok(order.into_iter().map(|i| &classes[i]).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names<'a>(classes: &[&'a ClassSpec]) -> Vec<&'a str> {
        classes.iter().map(|c| c.name.as_str()).collect()
    }

    fn assert_requirements_first(ordered: &[&ClassSpec]) {
        let position = |name: &str| ordered.iter().position(|c| c.name == name);
        for (i, class) in ordered.iter().enumerate() {
            for req in &class.requires {
                if let Some(r) = position(req) {
                    assert!(r < i, "{} must precede {}", req, class.name);
                }
            }
        }
    }

    #[test]
    fn test_chain_is_reversed() {
        let classes = vec![
            ClassSpec::new("C").requiring(&["B"]),
            ClassSpec::new("B").requiring(&["A"]),
            ClassSpec::new("A"),
        ];
        let ordered = resolve(&classes).unwrap();
        assert_eq!(names(&ordered), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_diamond() {
        let classes = vec![
            ClassSpec::new("Top").requiring(&["Left", "Right"]),
            ClassSpec::new("Left").requiring(&["Base"]),
            ClassSpec::new("Right").requiring(&["Base"]),
            ClassSpec::new("Base"),
        ];
        let ordered = resolve(&classes).unwrap();
        assert_eq!(names(&ordered), vec!["Base", "Left", "Right", "Top"]);
        assert_requirements_first(&ordered);
    }

    #[test]
    fn test_independent_classes_keep_declaration_order() {
        let classes = vec![ClassSpec::new("X"), ClassSpec::new("Y"), ClassSpec::new("Z")];
        let ordered = resolve(&classes).unwrap();
        assert_eq!(names(&ordered), vec!["X", "Y", "Z"]);
    }

    #[test]
    fn test_external_and_duplicate_requirements_ignored() {
        let classes = vec![
            ClassSpec::new("Layer").requiring(&["teq::iTensor", "Shape", "Shape"]),
            ClassSpec::new("Shape"),
        ];
        let graph = ClassGraph::new(&classes);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.dependents("Shape"), vec!["Layer"]);
        assert!(graph.dependents("Layer").is_empty());

        let ordered = resolve(&classes).unwrap();
        assert_eq!(names(&ordered), vec!["Shape", "Layer"]);
    }

    #[test]
    fn test_wide_graph_ordering() {
        let classes = vec![
            ClassSpec::new("F").requiring(&["E", "A"]),
            ClassSpec::new("E").requiring(&["D"]),
            ClassSpec::new("D").requiring(&["B", "C"]),
            ClassSpec::new("C").requiring(&["A"]),
            ClassSpec::new("B").requiring(&["A"]),
            ClassSpec::new("A"),
            ClassSpec::new("G"),
        ];
        let ordered = resolve(&classes).unwrap();
        assert_eq!(ordered.len(), classes.len());
        assert_requirements_first(&ordered);
    }

    #[test]
    fn test_two_cycle_without_sink() {
        let classes = vec![
            ClassSpec::new("A").requiring(&["B"]),
            ClassSpec::new("B").requiring(&["A"]),
        ];
        let err = resolve(&classes).unwrap_err();
        assert!(matches!(err, CodegenError::CircularDependency { .. }));
    }

    #[test]
    fn test_cycle_feeding_a_sink() {
        let classes = vec![
            ClassSpec::new("A").requiring(&["B"]),
            ClassSpec::new("B").requiring(&["A"]),
            ClassSpec::new("C").requiring(&["B"]),
        ];
        let err = resolve(&classes).unwrap_err();
        assert!(matches!(err, CodegenError::CircularDependency { .. }));
    }

    #[test]
    fn test_cycle_beside_a_sink() {
        let classes = vec![
            ClassSpec::new("A").requiring(&["B"]),
            ClassSpec::new("B").requiring(&["A"]),
            ClassSpec::new("Free"),
        ];
        match resolve(&classes).unwrap_err() {
            CodegenError::CircularDependency {
                requirement,
                dependent,
            } => {
                let pair = [requirement.as_str(), dependent.as_str()];
                assert!(pair.contains(&"A") && pair.contains(&"B"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_self_requirement() {
        let classes = vec![ClassSpec::new("A").requiring(&["A"]), ClassSpec::new("B")];
        assert!(resolve(&classes).is_err());
    }

    #[test]
    fn test_empty() {
        assert!(resolve(&[]).unwrap().is_empty());
    }
}
