mod test_broadcast_reaches_everyone;
mod test_three_peers_connect;
