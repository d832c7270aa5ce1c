//! Consumer partitioner
//!
//! A pure function of (node id, node list, room count): each room has a
//! single owning node under any given configuration, so no two nodes read
//! or ack the same room queue. When the node list changes, ownership
//! reshuffles uniformly without coordination; transiently two nodes may
//! own a room, which is benign because the queue is at-least-once and the
//! database insert is idempotent.

/// Rooms this node consumes.
///
/// Modulo distribution: room `r` belongs to the node at position
/// `(r - 1) % nodes` in the sorted node list. With an empty list
/// partitioning is disabled and every node consumes all rooms (duplicate
/// work is accepted). A node id missing from the list falls back to all
/// rooms rather than consuming nothing.
pub fn assigned_rooms(node_id: &str, node_list: &[String], rooms: u32) -> Vec<u32> {
    if node_list.is_empty() {
        tracing::info!(rooms, "partitioning disabled, consuming all rooms");
        return all_rooms(rooms);
    }

    let mut nodes: Vec<&str> = node_list.iter().map(String::as_str).collect();
    nodes.sort_unstable();

    let Some(index) = nodes.iter().position(|n| *n == node_id) else {
        tracing::warn!(
            node_id,
            ?nodes,
            "node id not in configured node list, consuming all rooms"
        );
        return all_rooms(rooms);
    };

    let assigned: Vec<u32> = (1..=rooms)
        .filter(|room| (*room as usize - 1) % nodes.len() == index)
        .collect();

    tracing::info!(
        node_id,
        node_index = index,
        node_count = nodes.len(),
        assigned_count = assigned.len(),
        ?assigned,
        "consumer partitioning active"
    );

    assigned
}

/// Assignment for every node, for the partition-status surface.
pub fn all_assignments(node_list: &[String], rooms: u32) -> Vec<(String, Vec<u32>)> {
    let mut nodes: Vec<&str> = node_list.iter().map(String::as_str).collect();
    nodes.sort_unstable();

    nodes
        .iter()
        .map(|node| (node.to_string(), assigned_rooms(node, node_list, rooms)))
        .collect()
}

fn all_rooms(rooms: u32) -> Vec<u32> {
    (1..=rooms).collect()
}
