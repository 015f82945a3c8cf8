use alloy_sol_types::sol;

sol! {
    interface IJackpot {
        function buySoloTickets(uint256 ticketCount) external payable returns (uint256);

        function ticketPrice() external view returns (uint256);

        function lpPoolTotal() external view returns (uint256);

        function userPoolTotal() external view returns (uint256);

        function lastJackpotEndTime() external view returns (uint256);

        function roundDurationInSeconds() external view returns (uint256);

        function feeBps() external view returns (uint256);

        function usersInfo(address user) external view returns (uint256 ticketsPurchasedTotalBps, uint256 winningsClaimable, bool active);

        /// Emitted once per settled round.
        event JackpotRun(uint256 time, address winner, uint256 winningTicket, uint256 winAmount, uint256 ticketsPurchasedTotalBps);
    }
}
