/// Sequential `about` ids grouping the nodes of one template call
#[derive(Clone, Debug)]
pub struct IDGenerator {
    prefix: String,
    count: u32,
}

impl Default for IDGenerator {
    fn default() -> Self {
        Self::new("#mwt")
    }
}

impl IDGenerator {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            count: 0,
        }
    }

    /// Generate next sequential ID
    pub fn new_id(&mut self) -> String {
        self.count += 1;
        format!("{}{}", self.prefix, self.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_ids() {
        let mut gen = IDGenerator::default();
        assert_eq!(gen.new_id(), "#mwt1");
        assert_eq!(gen.new_id(), "#mwt2");

        let mut other = IDGenerator::new("#x");
        assert_eq!(other.new_id(), "#x1");
    }
}
