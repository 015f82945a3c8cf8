use alloy_sol_types::sol;

sol! {
    interface IJackpotPool {
        function buyPoolTickets(uint256 poolId, uint256 ticketCount) external payable returns (uint256);

        function getPoolInfo(uint256 poolId) external view returns (uint256 totalTickets, uint256 ticketPrice, uint256 maxTicketsPerUser, uint256 endTime, bool isActive);

        /// Tickets held by the caller (`msg.sender`) in the pool.
        function getUserTickets(uint256 poolId) external view returns (uint256);
    }
}
