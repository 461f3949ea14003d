use super::Transform;
use crate::shader::Snippet;
use glam::Vec3;

/// A sequence of transforms in matrix-product order: the first element is
/// outermost, so `ChainTransform::new(vec![a, b]).map(p)` equals
/// `a.map(b.map(p))`. An empty chain is the identity.
pub struct ChainTransform {
    transforms: Vec<Box<dyn Transform>>,
}

impl ChainTransform {
    pub fn new(transforms: Vec<Box<dyn Transform>>) -> Self {
        Self { transforms }
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

impl Transform for ChainTransform {
    fn map(&self, p: Vec3) -> Vec3 {
        self.transforms.iter().rev().fold(p, |acc, t| t.map(acc))
    }

    fn imap(&self, p: Vec3) -> Vec3 {
        self.transforms.iter().fold(p, |acc, t| t.imap(acc))
    }

    fn shader_map(&self) -> Snippet {
        // Innermost call first: chain [a, b] emits `$t0($t1(pos))`.
        let mut call = String::from("pos");
        for i in (0..self.transforms.len()).rev() {
            call = format!("$t{i}({call})");
        }
        let mut snippet = Snippet::new(format!(
            "fn $name(pos: vec4<f32>) -> vec4<f32> {{ return {call}; }}"
        ));
        for (i, t) in self.transforms.iter().enumerate() {
            snippet = snippet.with_dep(format!("t{i}"), t.shader_map());
        }
        snippet
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{NullTransform, STTransform};

    fn close(a: Vec3, b: Vec3) {
        assert!((a - b).length() < 1e-5, "{a} != {b}");
    }

    #[test]
    fn chain_applies_last_element_first() {
        // outer doubles, inner shifts by one: map(p) = 2 * (p + 1)
        let outer = STTransform::new(Vec3::splat(2.0), Vec3::ZERO);
        let inner = STTransform::new(Vec3::ONE, Vec3::ONE);
        let chain = ChainTransform::new(vec![Box::new(outer), Box::new(inner)]);
        close(chain.map(Vec3::ZERO), Vec3::splat(2.0));
        close(chain.map(Vec3::ONE), Vec3::splat(4.0));
    }

    #[test]
    fn chain_imap_inverts_map() {
        let chain = ChainTransform::new(vec![
            Box::new(STTransform::new(Vec3::splat(3.0), Vec3::new(1.0, -2.0, 0.0))),
            Box::new(STTransform::new(Vec3::splat(0.5), Vec3::ZERO)),
        ]);
        let p = Vec3::new(0.3, -1.2, 2.0);
        close(chain.imap(chain.map(p)), p);
    }

    #[test]
    fn empty_chain_is_identity() {
        let chain = ChainTransform::new(Vec::new());
        let p = Vec3::new(5.0, 6.0, 7.0);
        close(chain.map(p), p);
        close(chain.imap(p), p);
        assert!(chain.is_empty());
    }

    #[test]
    fn shader_map_nests_calls_outermost_first() {
        let chain = ChainTransform::new(vec![Box::new(NullTransform), Box::new(NullTransform)]);
        let snippet = chain.shader_map();
        assert!(snippet.source().contains("return $t0($t1(pos));"));
        assert_eq!(snippet.deps().len(), 2);
        assert_eq!(snippet.deps()[0].0, "t0");
        assert_eq!(snippet.deps()[1].0, "t1");
    }
}
